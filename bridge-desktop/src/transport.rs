//! Content Transport Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    transport::{Transport, TransportResponse},
};
use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

/// Reqwest-based content transport.
///
/// Resumes with a `Range: bytes=N-` request. A `206` answer is a resumed
/// body; a `200` answer means the server ignored the range and sent the
/// whole resource.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with default timeouts
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(Duration::from_secs(10))
    }

    /// Create a transport with a custom connect timeout.
    ///
    /// There is no overall request timeout; a body may stream for as long as
    /// the track is long.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .pool_max_idle_per_host(4)
            .user_agent(concat!("cacheplay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if let Some(status) = e.status() {
            return BridgeError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        BridgeError::Network(e.to_string())
    }
}

/// Parse a `Content-Range` value of the form `bytes start-end/total`.
///
/// Returns the start offset and, when known, the full resource length.
fn parse_content_range(value: &str) -> Option<(u64, Option<u64>)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, _end) = range.split_once('-')?;

    let start = start.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        other => Some(other.parse().ok()?),
    };
    Some((start, total))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, url: &str, resume_offset: u64) -> Result<TransportResponse> {
        let mut request = self.client.get(url);
        if resume_offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", resume_offset));
        }

        debug!(url = %url, offset = resume_offset, "Opening content stream");
        let response = request.send().await.map_err(Self::map_send_error)?;
        let status = response.status();

        let (resumed_from, total_length) = match status {
            StatusCode::PARTIAL_CONTENT => {
                let range = response
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range);

                match range {
                    Some((start, total)) => (start, total),
                    None => {
                        warn!(url = %url, "206 response without a usable Content-Range");
                        (
                            resume_offset,
                            response.content_length().map(|len| len + resume_offset),
                        )
                    }
                }
            }
            status if status.is_success() => (0, response.content_length()),
            status => {
                return Err(BridgeError::Http {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string(),
                });
            }
        };

        debug!(
            url = %url,
            status = status.as_u16(),
            resumed_from,
            total_length = ?total_length,
            "Content stream open"
        );

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        Ok(TransportResponse::new(
            Box::new(StreamReader::new(stream)),
            total_length,
            resumed_from,
        ))
    }
}
