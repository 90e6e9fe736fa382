//! In-memory fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult, BridgeError, CachedContent, Catalog, Decoder, DecoderEvent,
    DecoderEventKind, DecoderEventSink, DecoderSession, DecoderSource, FileMetadata,
    FileSystemAccess, SystemClock, TrackId, TrackInfo, Transport, TransportResponse, VolumeInfo,
    WriteStream,
};
use bytes::Bytes;
use core_playback::{
    spawn_player, CacheConfig, CacheStore, DownloadConfig, PlaybackConfig, PlaybackSnapshot,
    PlayState, PlayerContext, PlayerHandle,
};
use core_runtime::events::{ListenerHub, Subscription};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;

pub const MB: u64 = 1024 * 1024;
pub const TRACK_SIZE: u64 = 4_096;
pub const CACHE_DIR: &str = "/cache";
pub const STATE_FILE: &str = "/state/player.state";

// ============================================================================
// File system
// ============================================================================

#[derive(Debug, Default, Clone)]
struct FakeFile {
    data: Vec<u8>,
    /// Size of content that exists only as a number (large sized fixtures).
    padding: u64,
}

impl FakeFile {
    fn len(&self) -> u64 {
        self.data.len() as u64 + self.padding
    }
}

#[derive(Debug)]
struct FsState {
    files: BTreeMap<PathBuf, FakeFile>,
    dirs: BTreeSet<PathBuf>,
    capacity: u64,
    mounted: bool,
    fail_writes: bool,
}

impl FsState {
    fn used(&self) -> u64 {
        self.files.values().map(FakeFile::len).sum()
    }
}

fn not_found(path: &Path) -> BridgeError {
    BridgeError::Io(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found", path.display()),
    ))
}

/// Volume of fixed capacity; free space is capacity minus file sizes.
#[derive(Clone)]
pub struct FakeFs {
    state: Arc<Mutex<FsState>>,
}

impl FakeFs {
    pub fn new(capacity: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(FsState {
                files: BTreeMap::new(),
                dirs: BTreeSet::new(),
                capacity,
                mounted: true,
                fail_writes: false,
            })),
        }
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, data: &[u8]) {
        self.state.lock().files.insert(
            path.into(),
            FakeFile {
                data: data.to_vec(),
                padding: 0,
            },
        );
    }

    /// A file of `len` bytes with no real content.
    pub fn add_sized_file(&self, path: impl Into<PathBuf>, len: u64) {
        self.state.lock().files.insert(
            path.into(),
            FakeFile {
                data: Vec::new(),
                padding: len,
            },
        );
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state
            .lock()
            .files
            .get(path.as_ref())
            .map(|file| file.data.clone())
    }

    pub fn len_of(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.state.lock().files.get(path.as_ref()).map(FakeFile::len)
    }

    pub fn has_file(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().files.contains_key(path.as_ref())
    }

    pub fn free_bytes(&self) -> u64 {
        let state = self.state.lock();
        state.capacity.saturating_sub(state.used())
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.state.lock().mounted = mounted;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    fn check_writable(&self) -> BridgeResult<()> {
        let state = self.state.lock();
        if !state.mounted {
            return Err(BridgeError::NotAvailable("volume unmounted".into()));
        }
        if state.fail_writes {
            return Err(BridgeError::Io(io::Error::other("write refused")));
        }
        Ok(())
    }

    fn writer(&self, path: &Path) -> WriteStream {
        Box::new(FakeWriter {
            path: path.to_path_buf(),
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeWriter {
    path: PathBuf,
    state: Arc<Mutex<FsState>>,
}

impl AsyncWrite for FakeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock();
        if !state.mounted || state.fail_writes {
            return Poll::Ready(Err(io::Error::other("write refused")));
        }
        let free = state.capacity.saturating_sub(state.used());
        if (buf.len() as u64) > free {
            return Poll::Ready(Err(io::Error::other("volume full")));
        }
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .data
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

#[async_trait]
impl FileSystemAccess for FakeFs {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        let state = self.state.lock();
        Ok(state.files.contains_key(path) || state.dirs.contains(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        let state = self.state.lock();
        if let Some(file) = state.files.get(path) {
            return Ok(FileMetadata {
                size: file.len(),
                modified_at: None,
                is_directory: false,
            });
        }
        if state.dirs.contains(path) {
            return Ok(FileMetadata {
                size: 0,
                modified_at: None,
                is_directory: true,
            });
        }
        Err(not_found(path))
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        let mut state = self.state.lock();
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.state
            .lock()
            .files
            .get(path)
            .map(|file| Bytes::from(file.data.clone()))
            .ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.check_writable()?;
        self.state.lock().files.insert(
            path.to_path_buf(),
            FakeFile {
                data: data.to_vec(),
                padding: 0,
            },
        );
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.state
            .lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        let mut state = self.state.lock();
        let file = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        let state = self.state.lock();
        Ok(state
            .files
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect())
    }

    async fn open_write_stream(&self, path: &Path) -> BridgeResult<WriteStream> {
        self.check_writable()?;
        self.state
            .lock()
            .files
            .insert(path.to_path_buf(), FakeFile::default());
        Ok(self.writer(path))
    }

    async fn open_append_stream(&self, path: &Path) -> BridgeResult<WriteStream> {
        self.check_writable()?;
        self.state
            .lock()
            .files
            .entry(path.to_path_buf())
            .or_default();
        Ok(self.writer(path))
    }

    async fn volume_info(&self, _path: &Path) -> BridgeResult<VolumeInfo> {
        let state = self.state.lock();
        if !state.mounted {
            return Ok(VolumeInfo::unmounted());
        }
        Ok(VolumeInfo {
            mounted: true,
            available_bytes: state.capacity.saturating_sub(state.used()),
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

pub fn track(track_id: TrackId, size_bytes: u64) -> TrackInfo {
    TrackInfo {
        track_id,
        source_id: 1,
        content_id: format!("c{}", track_id),
        title: format!("Track {}", track_id),
        artist: Some("Artist".into()),
        album: None,
        size_bytes,
        mime_type: "audio/mpeg".into(),
        content_url: url_for(track_id),
        cached_path: None,
        cached_at: None,
    }
}

pub fn url_for(track_id: TrackId) -> String {
    format!("http://media.test/{}", track_id)
}

pub fn cache_path(track_id: TrackId) -> PathBuf {
    PathBuf::from(format!("{}/1/c{}.mp3", CACHE_DIR, track_id))
}

#[derive(Default)]
pub struct FakeCatalog {
    tracks: Mutex<BTreeMap<TrackId, TrackInfo>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, track: TrackInfo) {
        self.tracks.lock().insert(track.track_id, track);
    }

    pub fn get(&self, track_id: TrackId) -> Option<TrackInfo> {
        self.tracks.lock().get(&track_id).cloned()
    }

    /// Record a committed entry directly.
    pub fn set_cached(&self, track_id: TrackId, path: impl Into<PathBuf>, cached_at: i64) {
        if let Some(track) = self.tracks.lock().get_mut(&track_id) {
            track.cached_path = Some(path.into());
            track.cached_at = Some(cached_at);
        }
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn lookup(&self, track_id: TrackId) -> BridgeResult<Option<TrackInfo>> {
        Ok(self.get(track_id))
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

#[derive(Debug, Clone)]
pub enum Route {
    Body(Vec<u8>),
    /// Serves only the first `n` bytes of the body, then ends.
    Truncated(Vec<u8>, usize),
    Status(u16),
    NetworkDown,
    /// Never produces data.
    Stall,
}

pub fn body_for(track_id: TrackId, len: u64) -> Vec<u8> {
    (0..len).map(|i| ((i as i64 + track_id) % 251) as u8).collect()
}

pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    opened: Mutex<Vec<(String, u64)>>,
    stalled: Mutex<Vec<DuplexStream>>,
    honour_ranges: bool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::with_ranges(true)
    }

    pub fn with_ranges(honour_ranges: bool) -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            opened: Mutex::new(Vec::new()),
            stalled: Mutex::new(Vec::new()),
            honour_ranges,
        }
    }

    pub fn route(&self, url: impl Into<String>, route: Route) {
        self.routes.lock().insert(url.into(), route);
    }

    pub fn opened(&self) -> Vec<(String, u64)> {
        self.opened.lock().clone()
    }

    fn serve(&self, data: &[u8], offset: u64) -> TransportResponse {
        let total = Some(data.len() as u64);
        if self.honour_ranges && offset > 0 && offset <= data.len() as u64 {
            let rest = data[offset as usize..].to_vec();
            TransportResponse::new(Box::new(io::Cursor::new(rest)), total, offset)
        } else {
            TransportResponse::new(Box::new(io::Cursor::new(data.to_vec())), total, 0)
        }
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, url: &str, resume_offset: u64) -> BridgeResult<TransportResponse> {
        self.opened.lock().push((url.to_string(), resume_offset));

        let route = self.routes.lock().get(url).cloned();
        match route {
            Some(Route::Body(data)) => Ok(self.serve(&data, resume_offset)),
            Some(Route::Truncated(data, n)) => {
                let mut response = self.serve(&data[..n.min(data.len())], resume_offset);
                response.total_length = Some(data.len() as u64);
                Ok(response)
            }
            Some(Route::Status(status)) => Err(BridgeError::Http {
                status,
                message: "fake status".into(),
            }),
            Some(Route::NetworkDown) => Err(BridgeError::Network("connection refused".into())),
            Some(Route::Stall) => {
                let (reader, writer) = tokio::io::duplex(64);
                self.stalled.lock().push(writer);
                Ok(TransportResponse::new(Box::new(reader), None, resume_offset))
            }
            None => Err(BridgeError::Http {
                status: 404,
                message: format!("no route for {}", url),
            }),
        }
    }

    fn supports_resume(&self) -> bool {
        self.honour_ranges
    }
}

// ============================================================================
// Decoder
// ============================================================================

#[derive(Default)]
struct DecoderState {
    sink: Option<DecoderEventSink>,
    session: Option<DecoderSession>,
    sources: Vec<DecoderSource>,
    calls: Vec<String>,
    position_ms: u64,
    duration_ms: Option<u64>,
    auto_prepare: bool,
}

/// Records calls and reports `Prepared` as soon as `prepare_async` is called.
pub struct FakeDecoder {
    state: Mutex<DecoderState>,
}

impl FakeDecoder {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DecoderState {
                auto_prepare: true,
                duration_ms: Some(180_000),
                ..DecoderState::default()
            }),
        }
    }

    pub fn manual() -> Self {
        let decoder = Self::new();
        decoder.state.lock().auto_prepare = false;
        decoder
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().position_ms = position_ms;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn sources(&self) -> Vec<DecoderSource> {
        self.state.lock().sources.clone()
    }

    pub fn last_source(&self) -> Option<DecoderSource> {
        self.state.lock().sources.last().cloned()
    }

    pub fn session(&self) -> Option<DecoderSession> {
        self.state.lock().session
    }

    /// Deliver a callback for the currently loaded source.
    pub fn emit(&self, kind: DecoderEventKind) {
        let state = self.state.lock();
        if let (Some(sink), Some(session)) = (&state.sink, state.session) {
            let _ = sink.send(DecoderEvent::new(session, kind));
        }
    }

    /// Deliver a callback tagged with an arbitrary session.
    pub fn emit_for(&self, session: DecoderSession, kind: DecoderEventKind) {
        if let Some(sink) = &self.state.lock().sink {
            let _ = sink.send(DecoderEvent::new(session, kind));
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

impl Default for FakeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decoder for FakeDecoder {
    fn set_event_sink(&self, sink: DecoderEventSink) {
        self.state.lock().sink = Some(sink);
    }

    async fn set_source(&self, session: DecoderSession, source: DecoderSource) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push("set_source".into());
        state.session = Some(session);
        state.sources.push(source);
        state.position_ms = 0;
        Ok(())
    }

    async fn prepare_async(&self) -> BridgeResult<()> {
        self.record("prepare");
        let auto = self.state.lock().auto_prepare;
        if auto {
            self.emit(DecoderEventKind::Prepared);
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

    async fn seek_to(&self, position_ms: u64) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("seek:{}", position_ms));
        state.position_ms = position_ms;
        Ok(())
    }

    async fn current_position_ms(&self) -> u64 {
        self.state.lock().position_ms
    }

    async fn duration_ms(&self) -> Option<u64> {
        self.state.lock().duration_ms
    }
}

// ============================================================================
// Player harness
// ============================================================================

/// Fakes wired into a player; `spawn` can be called again on the same
/// environment to simulate a process restart.
pub struct Env {
    pub fs: Arc<FakeFs>,
    pub catalog: Arc<FakeCatalog>,
    pub transport: Arc<FakeTransport>,
    pub decoder: Arc<FakeDecoder>,
    pub hub: Arc<ListenerHub>,
    pub playback: PlaybackConfig,
}

impl Env {
    pub fn new() -> Self {
        Self::with_decoder(FakeDecoder::new())
    }

    pub fn with_decoder(decoder: FakeDecoder) -> Self {
        Self {
            fs: Arc::new(FakeFs::new(1024 * MB)),
            catalog: Arc::new(FakeCatalog::new()),
            transport: Arc::new(FakeTransport::new()),
            decoder: Arc::new(decoder),
            hub: Arc::new(ListenerHub::new(256)),
            playback: PlaybackConfig::default().with_prefetch(false),
        }
    }

    /// Catalog entries with downloadable bodies.
    pub fn with_tracks(self, ids: &[TrackId]) -> Self {
        for id in ids {
            self.add_track(*id);
        }
        self
    }

    pub fn add_track(&self, track_id: TrackId) {
        self.catalog.add(track(track_id, TRACK_SIZE));
        self.transport
            .route(url_for(track_id), Route::Body(body_for(track_id, TRACK_SIZE)));
    }

    /// Write a state file as if a previous run had saved it.
    pub fn seed_state(&self, snapshot: &PlaybackSnapshot) {
        self.fs.add_file(STATE_FILE, &snapshot.encode());
    }

    /// Seed a stopped queue.
    pub fn seed_queue(&self, tracks: &[TrackId], position: i32) {
        self.seed_state(&PlaybackSnapshot {
            tracks: tracks.to_vec(),
            position,
            ..PlaybackSnapshot::default()
        });
    }

    pub fn cache_store(&self) -> Arc<CacheStore> {
        Arc::new(CacheStore::new(
            CacheConfig::new(CACHE_DIR).with_leave_free_bytes(0),
            self.fs.clone(),
            self.catalog.clone(),
            Arc::new(SystemClock),
        ))
    }

    pub async fn spawn(&self) -> (PlayerHandle, JoinHandle<()>) {
        spawn_player(PlayerContext {
            catalog: self.catalog.clone(),
            decoder: self.decoder.clone(),
            transport: self.transport.clone(),
            file_system: self.fs.clone(),
            cache: self.cache_store(),
            hub: Arc::clone(&self.hub),
            state_file: PathBuf::from(STATE_FILE),
            playback: self.playback.clone(),
            download: DownloadConfig::default().with_progress_interval(Duration::from_millis(1)),
        })
        .await
        .expect("player should start")
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
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

pub async fn wait_for_state(handle: &PlayerHandle, state: PlayState) {
    eventually(&format!("state {:?}", state), || {
        let handle = handle.clone();
        async move { handle.state().await.ok() == Some(state) }
    })
    .await;
}

pub async fn wait_for_position(handle: &PlayerHandle, position: i32) {
    eventually(&format!("position {}", position), || {
        let handle = handle.clone();
        async move { handle.position().await.ok() == Some(position) }
    })
    .await;
}

/// Everything currently queued on a subscription.
pub fn drain<E>(subscription: &mut Subscription<E>) -> Vec<E> {
    let mut events = Vec::new();
    while let Some(event) = subscription.try_recv() {
        events.push(event);
    }
    events
}
