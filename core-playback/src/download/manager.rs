//! # Download Manager
//!
//! Enforces the single-active-transfer rule and keeps a record per tracked
//! track so paused transfers can be resumed later.

use crate::config::DownloadConfig;
use crate::download::worker::Worker;
use crate::download::{CommitHook, Download, DownloadRequest, DownloadState, TransferId};
use bridge_traits::{FileSystemAccess, TrackId, Transport};
use core_runtime::events::DownloadEvent;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Finished and aborted records kept for inspection. Older ones are pruned
/// as transfers start and settle; paused and failed records are always kept.
pub const RETAINED_RECORDS: usize = 16;

pub(crate) struct ActiveTransfer {
    track_id: TrackId,
    transfer: TransferId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct Tracked {
    pub(crate) transfer: TransferId,
    pub(crate) record: Download,
    pub(crate) request: DownloadRequest,
}

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) active: Option<ActiveTransfer>,
    pub(crate) downloads: HashMap<TrackId, Tracked>,
}

impl Inner {
    /// Applies `update` to the record if it still belongs to `transfer` and
    /// has not been aborted. Returns whether the update was applied.
    pub(crate) fn update<F>(&mut self, track_id: TrackId, transfer: TransferId, update: F) -> bool
    where
        F: FnOnce(&mut Download),
    {
        match self.downloads.get_mut(&track_id) {
            Some(tracked)
                if tracked.transfer == transfer
                    && tracked.record.state != DownloadState::Aborted =>
            {
                update(&mut tracked.record);
                true
            }
            _ => false,
        }
    }

    /// Drops the oldest finished or aborted records beyond
    /// [`RETAINED_RECORDS`].
    pub(crate) fn prune(&mut self) {
        let mut settled: Vec<(TransferId, TrackId)> = self
            .downloads
            .iter()
            .filter(|(_, tracked)| {
                matches!(
                    tracked.record.state,
                    DownloadState::Finished | DownloadState::Aborted
                )
            })
            .map(|(track_id, tracked)| (tracked.transfer, *track_id))
            .collect();

        if settled.len() <= RETAINED_RECORDS {
            return;
        }

        settled.sort_unstable();
        let excess = settled.len() - RETAINED_RECORDS;
        for (_, track_id) in settled.into_iter().take(excess) {
            self.downloads.remove(&track_id);
        }
        debug!(pruned = excess, "Pruned settled download records");
    }

    /// Releases the active slot if `transfer` still holds it.
    pub(crate) fn release_slot(&mut self, transfer: TransferId) {
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.transfer == transfer)
        {
            self.active = None;
        }
    }
}

/// Runs at most one resumable transfer at a time.
pub struct DownloadManager {
    transport: Arc<dyn Transport>,
    fs: Arc<dyn FileSystemAccess>,
    commit: Arc<dyn CommitHook>,
    config: DownloadConfig,
    notices: mpsc::UnboundedSender<DownloadEvent>,
    inner: Arc<Mutex<Inner>>,
    next_transfer: AtomicU64,
}

impl DownloadManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        fs: Arc<dyn FileSystemAccess>,
        commit: Arc<dyn CommitHook>,
        config: DownloadConfig,
        notices: mpsc::UnboundedSender<DownloadEvent>,
    ) -> Self {
        Self {
            transport,
            fs,
            commit,
            config,
            notices,
            inner: Arc::new(Mutex::new(Inner::default())),
            next_transfer: AtomicU64::new(1),
        }
    }

    /// Start (or resume) a transfer, superseding any active one.
    #[instrument(skip(self, request), fields(track_id = request.track_id))]
    pub async fn start_download(&self, request: DownloadRequest) -> TransferId {
        self.stop_all_downloads().await;

        let transfer = TransferId(self.next_transfer.fetch_add(1, Ordering::Relaxed));
        let track_id = request.track_id;
        let expected_length = request.expected_length;

        let record = Download {
            track_id,
            url: request.url.clone(),
            destination: request.destination.clone(),
            expected_length,
            bytes_written: request.resume_offset,
            resume_offset: request.resume_offset,
            state: DownloadState::Connecting,
            last_error: None,
        };

        let worker = Worker {
            transport: Arc::clone(&self.transport),
            fs: Arc::clone(&self.fs),
            commit: Arc::clone(&self.commit),
            config: self.config.clone(),
            notices: self.notices.clone(),
            inner: Arc::clone(&self.inner),
            request: request.clone(),
            transfer,
        };

        let cancel = CancellationToken::new();

        // Hold the lock across spawn so the worker cannot finish and release
        // the slot before it is claimed.
        {
            let mut inner = self.inner.lock();
            inner.downloads.insert(
                track_id,
                Tracked {
                    transfer,
                    record,
                    request,
                },
            );
            inner.prune();
            let _ = self.notices.send(DownloadEvent::Begin {
                track_id,
                total_bytes: expected_length,
            });

            let handle = tokio::spawn(worker.run(cancel.clone()));
            inner.active = Some(ActiveTransfer {
                track_id,
                transfer,
                cancel,
                handle,
            });
        }

        info!(%transfer, expected_length, "Download started");
        transfer
    }

    /// Interrupt the transfer for `track_id`, or forget its paused record.
    #[instrument(skip(self))]
    pub async fn stop_download(&self, track_id: TrackId) {
        let active = {
            let mut inner = self.inner.lock();
            if inner
                .active
                .as_ref()
                .is_some_and(|active| active.track_id == track_id)
            {
                inner.active.take()
            } else {
                None
            }
        };

        match active {
            Some(active) => self.abort(active).await,
            None => self.abort_paused(track_id),
        }
    }

    /// Interrupt whatever transfer is active. Partial files stay on disk.
    pub async fn stop_all_downloads(&self) {
        let active = self.inner.lock().active.take();
        if let Some(active) = active {
            self.abort(active).await;
        }
    }

    /// Restart the most recent transfer that paused on a local or remote
    /// failure. Returns `false` if nothing was resumed.
    #[instrument(skip(self))]
    pub async fn resume_downloads(&self) -> bool {
        let request = {
            let inner = self.inner.lock();
            if inner.active.is_some() {
                debug!("Transfer already active, nothing to resume");
                return false;
            }

            inner
                .downloads
                .values()
                .filter(|tracked| tracked.record.state.is_paused())
                .max_by_key(|tracked| tracked.transfer)
                .map(|tracked| DownloadRequest {
                    resume_offset: tracked.record.bytes_written,
                    ..tracked.request.clone()
                })
        };

        match request {
            Some(request) => {
                info!(
                    track_id = request.track_id,
                    offset = request.resume_offset,
                    "Resuming paused download"
                );
                self.start_download(request).await;
                true
            }
            None => false,
        }
    }

    /// Record for `track_id`, if tracked.
    pub fn snapshot(&self, track_id: TrackId) -> Option<Download> {
        self.inner
            .lock()
            .downloads
            .get(&track_id)
            .map(|tracked| tracked.record.clone())
    }

    /// The request the tracked record for `track_id` was started from.
    pub fn request_for(&self, track_id: TrackId) -> Option<DownloadRequest> {
        self.inner
            .lock()
            .downloads
            .get(&track_id)
            .map(|tracked| tracked.request.clone())
    }

    /// Record of the running transfer, if any.
    pub fn active(&self) -> Option<Download> {
        let inner = self.inner.lock();
        let active = inner.active.as_ref()?;
        inner
            .downloads
            .get(&active.track_id)
            .map(|tracked| tracked.record.clone())
    }

    pub fn has_active(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    pub fn is_active(&self, track_id: TrackId) -> bool {
        self.inner
            .lock()
            .active
            .as_ref()
            .is_some_and(|active| active.track_id == track_id)
    }

    /// All tracked records, ordered by track id.
    pub fn tracked(&self) -> Vec<Download> {
        let mut records: Vec<Download> = self
            .inner
            .lock()
            .downloads
            .values()
            .map(|tracked| tracked.record.clone())
            .collect();
        records.sort_by_key(|record| record.track_id);
        records
    }

    async fn abort(&self, active: ActiveTransfer) {
        let mut aborted = false;
        self.inner
            .lock()
            .update(active.track_id, active.transfer, |record| {
                if record.state.is_active() {
                    record.state = DownloadState::Aborted;
                    aborted = true;
                }
            });
        active.cancel.cancel();

        if aborted {
            info!(track_id = active.track_id, transfer = %active.transfer, "Download aborted");
            let _ = self.notices.send(DownloadEvent::Cancel {
                track_id: active.track_id,
            });
        }

        if let Err(e) = active.handle.await {
            if e.is_panic() {
                warn!(track_id = active.track_id, "Download worker panicked");
            }
        }
    }

    fn abort_paused(&self, track_id: TrackId) {
        let forgotten = {
            let mut inner = self.inner.lock();
            match inner.downloads.get_mut(&track_id) {
                Some(tracked) if tracked.record.state.is_paused() => {
                    tracked.record.state = DownloadState::Aborted;
                    true
                }
                _ => false,
            }
        };

        if forgotten {
            debug!(track_id, "Dropped paused download");
            let _ = self.notices.send(DownloadEvent::Cancel { track_id });
        }
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        if let Some(active) = self.inner.lock().active.take() {
            active.cancel.cancel();
        }
    }
}
