//! Content Transport Abstraction
//!
//! Opens a byte stream for a remote resource, optionally starting at a byte
//! offset so interrupted downloads can continue where they stopped.

use async_trait::async_trait;
use std::fmt;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Body stream returned by a transport.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// An opened transfer.
pub struct TransportResponse {
    /// Remaining bytes of the resource, starting at `resumed_from`
    pub body: ByteStream,
    /// Length of the complete resource, when the server reports it
    pub total_length: Option<u64>,
    /// Offset the body actually starts at.
    ///
    /// Equals the requested offset when the server honoured it and `0` when
    /// it sent the whole resource instead.
    pub resumed_from: u64,
}

impl TransportResponse {
    pub fn new(body: ByteStream, total_length: Option<u64>, resumed_from: u64) -> Self {
        Self {
            body,
            total_length,
            resumed_from,
        }
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("total_length", &self.total_length)
            .field("resumed_from", &self.resumed_from)
            .finish_non_exhaustive()
    }
}

/// Resumable fetch of remote content.
///
/// Errors should be reported as [`BridgeError::Http`](crate::BridgeError::Http)
/// for non-success statuses and [`BridgeError::Network`](crate::BridgeError::Network)
/// for connectivity problems, so callers can tell permanent failures from
/// transient ones.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::transport::Transport;
///
/// async fn fetch_tail(transport: &dyn Transport, url: &str, have: u64) -> Result<()> {
///     let response = transport.open(url, have).await?;
///     if response.resumed_from != have {
///         // server ignored the range, start over
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open `url`, asking the server to skip the first `resume_offset` bytes.
    async fn open(&self, url: &str, resume_offset: u64) -> Result<TransportResponse>;

    /// Whether this transport can honour a non-zero resume offset at all.
    ///
    /// When `false` callers always restart transfers from the beginning.
    fn supports_resume(&self) -> bool {
        true
    }
}
