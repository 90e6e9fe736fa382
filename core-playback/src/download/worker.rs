//! Transfer task: streams one transport body into a cache file.

use crate::config::DownloadConfig;
use crate::download::manager::Inner;
use crate::download::{CommitHook, DownloadRequest, DownloadState, TransferId};
use bridge_traits::{BridgeError, FileSystemAccess, Transport, TransportResponse, WriteStream};
use core_runtime::events::DownloadEvent;
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct TransferFailure {
    state: DownloadState,
    message: String,
}

impl TransferFailure {
    fn new(state: DownloadState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }

    fn remote(message: impl Into<String>) -> Self {
        Self::new(DownloadState::PausedRemoteFailure, message)
    }

    fn file(message: impl Into<String>) -> Self {
        Self::new(DownloadState::FileError, message)
    }
}

type TransferResult<T> = std::result::Result<T, TransferFailure>;

pub(crate) struct Worker {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) fs: Arc<dyn FileSystemAccess>,
    pub(crate) commit: Arc<dyn CommitHook>,
    pub(crate) config: DownloadConfig,
    pub(crate) notices: mpsc::UnboundedSender<DownloadEvent>,
    pub(crate) inner: Arc<Mutex<Inner>>,
    pub(crate) request: DownloadRequest,
    pub(crate) transfer: TransferId,
}

impl Worker {
    pub(crate) async fn run(self, cancel: CancellationToken) {
        let track_id = self.request.track_id;

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(track_id, transfer = %self.transfer, "Transfer interrupted");
            }
            outcome = self.transfer() => {
                self.finish(outcome);
            }
        }
    }

    async fn transfer(&self) -> TransferResult<()> {
        let request = &self.request;
        let expected = request.expected_length;
        let mut offset = self.usable_offset().await?;

        if offset > 0 && offset == expected {
            debug!(track_id = request.track_id, "Partial file already complete");
            return self.commit().await;
        }

        let mut response = self.open(offset).await?;
        if response.resumed_from != offset {
            debug!(
                track_id = request.track_id,
                requested = offset,
                resumed_from = response.resumed_from,
                "Server did not honour resume offset, restarting"
            );
            if response.resumed_from != 0 {
                response = self.open(0).await?;
                if response.resumed_from != 0 {
                    return Err(TransferFailure::remote(format!(
                        "server resumed at byte {}",
                        response.resumed_from
                    )));
                }
            }
            offset = 0;
        }

        if let Some(total) = response.total_length {
            if total != expected {
                warn!(
                    track_id = request.track_id,
                    expected, total, "Transport length disagrees with catalog size"
                );
            }
        }

        let mut writer = self.open_writer(offset).await?;

        self.update(|record| {
            record.state = DownloadState::Downloading;
            record.bytes_written = offset;
            record.resume_offset = offset;
        });

        let mut body = response.body;
        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        let mut written = offset;
        let mut last_report = Instant::now();

        loop {
            let n = match body.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    let _ = writer.flush().await;
                    return Err(TransferFailure::remote(format!("read failed: {}", e)));
                }
            };

            if written + n as u64 > expected {
                return Err(TransferFailure::file(format!(
                    "body exceeds expected length of {} bytes",
                    expected
                )));
            }

            if let Err(e) = writer.write_all(&buf[..n]).await {
                return Err(self.write_failure(e.to_string()).await);
            }
            written += n as u64;
            self.update(|record| record.bytes_written = written);

            if last_report.elapsed() >= self.config.progress_interval {
                last_report = Instant::now();
                let _ = self.notices.send(DownloadEvent::Progress {
                    track_id: request.track_id,
                    downloaded_bytes: written,
                    total_bytes: expected,
                });
            }
        }

        if let Err(e) = writer.shutdown().await {
            return Err(self.write_failure(e.to_string()).await);
        }

        if written < expected {
            return Err(TransferFailure::remote(format!(
                "stream ended after {} of {} bytes",
                written, expected
            )));
        }

        self.commit().await
    }

    /// The resume offset, if the partial file on disk agrees with it.
    async fn usable_offset(&self) -> TransferResult<u64> {
        let requested = self.request.resume_offset;
        if requested == 0 {
            return Ok(0);
        }

        if !self.transport.supports_resume() {
            debug!(track_id = self.request.track_id, "Transport cannot resume");
            return Ok(0);
        }

        let existing = self
            .fs
            .file_len(&self.request.destination)
            .await
            .map_err(|e| TransferFailure::file(e.to_string()))?;

        if existing == Some(requested) {
            Ok(requested)
        } else {
            debug!(
                track_id = self.request.track_id,
                requested,
                existing = ?existing,
                "Partial file does not match resume offset"
            );
            Ok(0)
        }
    }

    async fn open(&self, offset: u64) -> TransferResult<TransportResponse> {
        match self.transport.open(&self.request.url, offset).await {
            Ok(response) => Ok(response),
            Err(BridgeError::Http { status, message }) => Err(TransferFailure::new(
                DownloadState::HttpError,
                format!("HTTP {}: {}", status, message),
            )),
            Err(e) => Err(TransferFailure::remote(e.to_string())),
        }
    }

    async fn open_writer(&self, offset: u64) -> TransferResult<WriteStream> {
        let path = &self.request.destination;
        let opened = if offset > 0 {
            self.fs.open_append_stream(path).await
        } else {
            self.fs.open_write_stream(path).await
        };

        match opened {
            Ok(writer) => Ok(writer),
            Err(e) => Err(self.write_failure(e.to_string()).await),
        }
    }

    /// Classifies a local write failure: an unmounted volume pauses the
    /// transfer, anything else is a file error.
    async fn write_failure(&self, message: String) -> TransferFailure {
        let dir = self
            .request
            .destination
            .parent()
            .unwrap_or(&self.request.destination);

        match self.fs.volume_info(dir).await {
            Ok(volume) if !volume.mounted => {
                TransferFailure::new(DownloadState::PausedLocalFailure, message)
            }
            _ => TransferFailure::file(message),
        }
    }

    async fn commit(&self) -> TransferResult<()> {
        self.commit
            .commit(
                &self.request.cache_key,
                &self.request.destination,
                self.request.expected_length,
            )
            .await
            .map_err(|e| TransferFailure::file(format!("commit failed: {}", e)))
    }

    fn update<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut crate::download::Download),
    {
        self.inner
            .lock()
            .update(self.request.track_id, self.transfer, update)
    }

    fn finish(&self, outcome: TransferResult<()>) {
        let track_id = self.request.track_id;

        let event = match outcome {
            Ok(()) => {
                let expected = self.request.expected_length;
                let applied = self.update(|record| {
                    record.state = DownloadState::Finished;
                    record.bytes_written = expected;
                });
                if !applied {
                    return;
                }
                info!(
                    track_id,
                    file = %strip_path(&self.request.destination),
                    "Download finished"
                );
                DownloadEvent::Finish { track_id }
            }
            Err(failure) => {
                let message = failure.message.clone();
                let applied = self.update(|record| {
                    record.state = failure.state;
                    record.last_error = Some(message);
                });
                if !applied {
                    return;
                }
                if failure.state.is_paused() {
                    warn!(track_id, state = ?failure.state, error = %failure.message, "Download paused");
                } else {
                    error!(track_id, state = ?failure.state, error = %failure.message, "Download failed");
                }
                DownloadEvent::Error {
                    track_id,
                    message: failure.message,
                    retryable: failure.state.is_paused(),
                }
            }
        };

        // Publish under the lock so a superseding start cannot slip its
        // Begin in ahead of this transfer's final notice.
        let mut inner = self.inner.lock();
        inner.release_slot(self.transfer);
        inner.prune();
        let _ = self.notices.send(event);
    }
}
