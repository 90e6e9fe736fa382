//! Host fakes for service-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, BridgeError, CachedContent, CallState, CallStateMonitor,
    CallStateStream, Catalog, Decoder, DecoderEvent, DecoderEventKind, DecoderEventSink,
    DecoderSession, DecoderSource, FileMetadata, FileSystemAccess, KeepAlive, NetworkChangeStream,
    NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType, TrackId, TrackInfo, Transport,
    TransportResponse, VolumeInfo, WriteStream,
};
use bytes::Bytes;
use core_service::{EngineConfig, PlayerHandle, PlayState};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;

pub const TRACK_SIZE: u64 = 2_048;
pub const IDLE_DELAY: Duration = Duration::from_secs(120);

// ============================================================================
// File system
// ============================================================================

type Files = Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>;

/// Unbounded in-memory volume.
#[derive(Clone, Default)]
pub struct MemoryFs {
    files: Files,
}

impl MemoryFs {
    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().contains_key(path.as_ref())
    }

    fn writer(&self, path: &Path) -> WriteStream {
        Box::new(MemoryWriter {
            path: path.to_path_buf(),
            files: Arc::clone(&self.files),
        })
    }
}

struct MemoryWriter {
    path: PathBuf,
    files: Files,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.files
            .lock()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn not_found(path: &Path) -> BridgeError {
    BridgeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

#[async_trait]
impl FileSystemAccess for MemoryFs {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.files.lock().contains_key(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        let files = self.files.lock();
        let data = files.get(path).ok_or_else(|| not_found(path))?;
        Ok(FileMetadata {
            size: data.len() as u64,
            modified_at: None,
            is_directory: false,
        })
    }

    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.files
            .lock()
            .get(path)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.files.lock().insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        let mut files = self.files.lock();
        let data = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect())
    }

    async fn open_write_stream(&self, path: &Path) -> BridgeResult<WriteStream> {
        self.files.lock().insert(path.to_path_buf(), Vec::new());
        Ok(self.writer(path))
    }

    async fn open_append_stream(&self, path: &Path) -> BridgeResult<WriteStream> {
        self.files.lock().entry(path.to_path_buf()).or_default();
        Ok(self.writer(path))
    }

    async fn volume_info(&self, _path: &Path) -> BridgeResult<VolumeInfo> {
        Ok(VolumeInfo {
            mounted: true,
            available_bytes: 1 << 40,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub fn url_for(track_id: TrackId) -> String {
    format!("http://media.test/{}", track_id)
}

#[derive(Default)]
pub struct MemoryCatalog {
    tracks: Mutex<BTreeMap<TrackId, TrackInfo>>,
}

impl MemoryCatalog {
    pub fn with_tracks(ids: &[TrackId]) -> Self {
        let catalog = Self::default();
        for &track_id in ids {
            catalog.tracks.lock().insert(
                track_id,
                TrackInfo {
                    track_id,
                    source_id: 1,
                    content_id: format!("c{}", track_id),
                    title: format!("Track {}", track_id),
                    artist: None,
                    album: None,
                    size_bytes: TRACK_SIZE,
                    mime_type: "audio/mpeg".into(),
                    content_url: url_for(track_id),
                    cached_path: None,
                    cached_at: None,
                },
            );
        }
        catalog
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn lookup(&self, track_id: TrackId) -> BridgeResult<Option<TrackInfo>> {
        Ok(self.tracks.lock().get(&track_id).cloned())
    }

    async fn cached_entries(&self) -> BridgeResult<Vec<CachedContent>> {
        Ok(self
            .tracks
            .lock()
            .values()
            .filter_map(|track| {
                Some(CachedContent {
                    source_id: track.source_id,
                    content_id: track.content_id.clone(),
                    path: track.cached_path.clone()?,
                    size_bytes: track.size_bytes,
                    cached_at: track.cached_at?,
                })
            })
            .collect())
    }

    async fn mark_cached(
        &self,
        source_id: i64,
        content_id: &str,
        path: &Path,
        cached_at: i64,
    ) -> BridgeResult<()> {
        for track in self.tracks.lock().values_mut() {
            if track.source_id == source_id && track.content_id == content_id {
                track.cached_path = Some(path.to_path_buf());
                track.cached_at = Some(cached_at);
            }
        }
        Ok(())
    }

    async fn clear_cached(&self, source_id: i64, content_id: &str) -> BridgeResult<()> {
        for track in self.tracks.lock().values_mut() {
            if track.source_id == source_id && track.content_id == content_id {
                track.cached_path = None;
                track.cached_at = None;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Serves a fixed body for every URL while online.
pub struct SwitchTransport {
    online: AtomicBool,
    opens: AtomicUsize,
}

impl SwitchTransport {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            opens: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for SwitchTransport {
    async fn open(&self, _url: &str, resume_offset: u64) -> BridgeResult<TransportResponse> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("offline".into()));
        }

        let body = vec![7u8; TRACK_SIZE as usize];
        let offset = resume_offset.min(TRACK_SIZE);
        Ok(TransportResponse::new(
            Box::new(io::Cursor::new(body[offset as usize..].to_vec())),
            Some(TRACK_SIZE),
            offset,
        ))
    }
}

// ============================================================================
// Decoder
// ============================================================================

#[derive(Default)]
struct DecoderState {
    sink: Option<DecoderEventSink>,
    session: Option<DecoderSession>,
    calls: Vec<String>,
}

/// Reports `Prepared` as soon as it is asked to prepare.
#[derive(Default)]
pub struct InstantDecoder {
    state: Mutex<DecoderState>,
}

impl InstantDecoder {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }
}

#[async_trait]
impl Decoder for InstantDecoder {
    fn set_event_sink(&self, sink: DecoderEventSink) {
        self.state.lock().sink = Some(sink);
    }

    async fn set_source(&self, session: DecoderSession, _source: DecoderSource) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("set_source".into());
        state.session = Some(session);
        Ok(())
    }

    async fn prepare_async(&self) -> BridgeResult<()> {
        let state = self.state.lock();
        if let (Some(sink), Some(session)) = (&state.sink, state.session) {
            let _ = sink.send(DecoderEvent::new(session, DecoderEventKind::Prepared));
        }
        Ok(())
    }

    async fn start(&self) -> BridgeResult<()> {
        self.record("start");
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    async fn reset(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("reset".into());
        state.session = None;
        Ok(())
    }

    async fn seek_to(&self, _position_ms: u64) -> BridgeResult<()> {
        Ok(())
    }

    async fn current_position_ms(&self) -> u64 {
        0
    }

    async fn duration_ms(&self) -> Option<u64> {
        Some(60_000)
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Call-state monitor driven by the test through an mpsc sender.
pub struct ChannelCallMonitor {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<CallState>>>,
}

impl ChannelCallMonitor {
    pub fn new() -> (Self, mpsc::UnboundedSender<CallState>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Mutex::new(Some(receiver)),
            },
            sender,
        )
    }
}

struct ChannelCallStream(mpsc::UnboundedReceiver<CallState>);

#[async_trait]
impl CallStateStream for ChannelCallStream {
    async fn next(&mut self) -> Option<CallState> {
        self.0.recv().await
    }
}

#[async_trait]
impl CallStateMonitor for ChannelCallMonitor {
    async fn current_state(&self) -> BridgeResult<CallState> {
        Ok(CallState::Idle)
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn CallStateStream>> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("already subscribed".into()))?;
        Ok(Box::new(ChannelCallStream(receiver)))
    }
}

pub fn network_info(status: NetworkStatus) -> NetworkInfo {
    NetworkInfo {
        status,
        network_type: (status == NetworkStatus::Connected).then_some(NetworkType::WiFi),
        is_metered: false,
    }
}

/// Network monitor driven by the test through an mpsc sender.
pub struct ChannelNetworkMonitor {
    initial: NetworkStatus,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<NetworkStatus>>>,
    /// Keeps the stream open after the test drops its sender.
    _sender: mpsc::UnboundedSender<NetworkStatus>,
}

impl ChannelNetworkMonitor {
    pub fn new(initial: NetworkStatus) -> (Self, mpsc::UnboundedSender<NetworkStatus>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                initial,
                receiver: Mutex::new(Some(receiver)),
                _sender: sender.clone(),
            },
            sender,
        )
    }
}

struct ChannelNetworkStream(mpsc::UnboundedReceiver<NetworkStatus>);

#[async_trait]
impl NetworkChangeStream for ChannelNetworkStream {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.0.recv().await.map(network_info)
    }
}

#[async_trait]
impl NetworkMonitor for ChannelNetworkMonitor {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(network_info(self.initial))
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("already subscribed".into()))?;
        Ok(Box::new(ChannelNetworkStream(receiver)))
    }
}

mock! {
    pub WakeLock {}

    #[async_trait]
    impl KeepAlive for WakeLock {
        async fn acquire(&self) -> BridgeResult<()>;
        async fn release(&self) -> BridgeResult<()>;
        fn is_held(&self) -> bool;
    }
}

/// A wake lock that must be acquired and released exactly once.
pub fn strict_wake_lock() -> MockWakeLock {
    let mut lock = MockWakeLock::new();
    lock.expect_acquire().times(1).returning(|| Ok(()));
    lock.expect_release().times(1).returning(|| Ok(()));
    lock.expect_is_held().returning(|| false);
    lock
}

// ============================================================================
// Harness
// ============================================================================

pub struct Host {
    pub fs: Arc<MemoryFs>,
    pub catalog: Arc<MemoryCatalog>,
    pub transport: Arc<SwitchTransport>,
    pub decoder: Arc<InstantDecoder>,
}

impl Host {
    pub fn new(tracks: &[TrackId]) -> Self {
        Self {
            fs: Arc::new(MemoryFs::default()),
            catalog: Arc::new(MemoryCatalog::with_tracks(tracks)),
            transport: Arc::new(SwitchTransport::new(true)),
            decoder: Arc::new(InstantDecoder::default()),
        }
    }

    /// Builder with every bridge injected except the signal monitors and
    /// the keep-alive.
    pub fn builder(&self) -> core_runtime::config::EngineConfigBuilder {
        EngineConfig::builder()
            .state_file("/state/player.state")
            .cache_dir("/cache")
            .leave_free_bytes(0)
            .catalog(self.catalog.clone())
            .decoder(self.decoder.clone())
            .transport(self.transport.clone())
            .file_system(self.fs.clone())
            .prefetch(false)
            .progress_interval(Duration::from_millis(1))
            .idle_shutdown_delay(IDLE_DELAY)
    }
}

/// A network monitor that never reports a change.
pub fn quiet_network() -> Arc<ChannelNetworkMonitor> {
    let (monitor, _sender) = ChannelNetworkMonitor::new(NetworkStatus::Connected);
    Arc::new(monitor)
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}

pub async fn wait_for_state(player: &PlayerHandle, state: PlayState) {
    eventually(&format!("state {:?}", state), || {
        let player = player.clone();
        async move { player.state().await.ok() == Some(state) }
    })
    .await;
}
