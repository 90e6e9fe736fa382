//! Mime type to cache file extension table.

/// Extension (with leading dot) for a supported audio mime type.
///
/// Parameters after `;` are ignored and matching is case-insensitive.
pub fn extension_for(mime_type: &str) -> Option<&'static str> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "audio/mpeg" | "audio/mp3" => ".mp3",
        "audio/mp4" | "audio/x-m4a" => ".m4a",
        "audio/aac" => ".aac",
        "audio/ogg" | "application/ogg" => ".ogg",
        "audio/flac" | "audio/x-flac" => ".flac",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/x-ms-wma" => ".wma",
        "audio/opus" => ".opus",
        _ => return None,
    };

    Some(ext)
}
