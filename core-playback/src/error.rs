//! # Playback Error Types
//!
//! Error taxonomy for the cache, download and controller layers.

use thiserror::Error;

/// Errors that can occur inside the playback engine.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// The cache volume is unmounted or missing.
    #[error("No storage medium available")]
    NoStorageMedium,

    /// Eviction could not free enough space for the allocation.
    #[error("Out of cache space: requested {requested} bytes, {available} available")]
    OutOfSpace { requested: u64, available: u64 },

    /// The track's mime type has no cache file extension.
    #[error("Unknown mime type: {0}")]
    UnknownMimeType(String),

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// Connection dropped or timed out; waits for connectivity to come back.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Server answered with a 4xx/5xx status.
    #[error("HTTP error {status}")]
    PermanentHttp { status: u16 },

    /// Downloaded byte count disagrees with the catalog size.
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    // ========================================================================
    // Decode / Catalog Errors
    // ========================================================================
    /// Decoder rejected or failed to play the source.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The catalog has no record for this id.
    #[error("Track not found: {0}")]
    TrackNotFound(i64),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The state file could not be parsed.
    #[error("Corrupt state file: {0}")]
    CorruptState(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// The controller task has exited.
    #[error("Playback engine stopped")]
    EngineStopped,

    /// A host bridge call failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the failure may clear up once connectivity returns.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::TransientNetwork(_) => true,
            PlaybackError::Bridge(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` for errors that block a cache allocation.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::NoStorageMedium
                | PlaybackError::OutOfSpace { .. }
                | PlaybackError::UnknownMimeType(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
