//! Audio decoder bridge.
//!
//! The engine never decodes audio itself. It hands the host decoder a file
//! and drives it through prepare/start/pause/stop; the decoder reports back
//! asynchronously through a [`DecoderEventSink`].

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

/// Identifies one `set_source` call.
///
/// Every callback carries the session it belongs to, so a late callback for
/// a source that has since been replaced can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderSession(Uuid);

impl DecoderSession {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DecoderSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the decoder should read audio from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderSource {
    /// A complete, committed cache file.
    File { path: PathBuf },
    /// A cache file still being written by a download.
    ///
    /// The decoder should treat a short read as buffering rather than end of
    /// stream until `expected_length` bytes are available.
    Growing { path: PathBuf, expected_length: u64 },
}

impl DecoderSource {
    pub fn path(&self) -> &PathBuf {
        match self {
            DecoderSource::File { path } | DecoderSource::Growing { path, .. } => path,
        }
    }
}

/// Callback payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEventKind {
    /// `prepare_async` finished; the source can be started.
    Prepared,
    /// Playback reached the natural end of the source.
    Completion,
    /// The decoder gave up on the source.
    Error { code: i32, message: String },
    /// Percent of the source buffered so far.
    BufferingUpdate { percent: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderEvent {
    pub session: DecoderSession,
    pub kind: DecoderEventKind,
}

impl DecoderEvent {
    pub fn new(session: DecoderSession, kind: DecoderEventKind) -> Self {
        Self { session, kind }
    }
}

/// Channel the decoder reports callbacks on.
pub type DecoderEventSink = mpsc::UnboundedSender<DecoderEvent>;

/// Host audio decoder.
///
/// All methods are expected to return promptly; long-running work
/// (preparing, buffering) completes through callbacks.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Install the callback channel. Called once before any other method.
    fn set_event_sink(&self, sink: DecoderEventSink);

    /// Replace the current source. Implicitly stops anything playing.
    async fn set_source(&self, session: DecoderSession, source: DecoderSource) -> Result<()>;

    /// Begin preparing the current source; completion arrives as
    /// [`DecoderEventKind::Prepared`] or [`DecoderEventKind::Error`].
    async fn prepare_async(&self) -> Result<()>;

    async fn start(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Release the current source and return to the idle state.
    async fn reset(&self) -> Result<()>;

    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Playback position of the prepared source in milliseconds.
    async fn current_position_ms(&self) -> u64;

    /// Duration of the prepared source, if known.
    async fn duration_ms(&self) -> Option<u64>;
}
