//! The controller task.

use crate::cache::{CacheKey, CacheStore};
use crate::config::PlaybackConfig;
use crate::controller::command::Command;
use crate::controller::PlayState;
use crate::download::{DownloadManager, DownloadRequest};
use crate::error::{PlaybackError, Result};
use crate::persistence::{PlaybackSnapshot, StatePersistence};
use crate::queue::PlaylistQueue;
use bridge_traits::{
    CallState, Catalog, Decoder, DecoderEvent, DecoderEventKind, DecoderSession, DecoderSource,
    TrackId, TrackInfo,
};
use core_runtime::events::{ChangeEvent, DownloadEvent, ListenerHub, MoveEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// The decoder source currently loaded.
#[derive(Debug, Clone)]
struct Session {
    id: DecoderSession,
    track_id: TrackId,
    key: CacheKey,
    path: PathBuf,
    prepared: bool,
}

pub(crate) struct PlayerActor {
    catalog: Arc<dyn Catalog>,
    decoder: Arc<dyn Decoder>,
    cache: Arc<CacheStore>,
    downloads: DownloadManager,
    persistence: StatePersistence,
    hub: Arc<ListenerHub>,
    config: PlaybackConfig,
    published: watch::Sender<PlayState>,

    queue: PlaylistQueue,
    state: PlayState,
    session: Option<Session>,
    /// Offset reported by `tell` for a paused session recovered from disk.
    paused_offset_ms: Option<u64>,
    resume_after_call: bool,
    dirty: bool,
}

impl PlayerActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        catalog: Arc<dyn Catalog>,
        decoder: Arc<dyn Decoder>,
        cache: Arc<CacheStore>,
        downloads: DownloadManager,
        persistence: StatePersistence,
        hub: Arc<ListenerHub>,
        config: PlaybackConfig,
        published: watch::Sender<PlayState>,
    ) -> Self {
        Self {
            catalog,
            decoder,
            cache,
            downloads,
            persistence,
            hub,
            config,
            published,
            queue: PlaylistQueue::new(),
            state: PlayState::Stopped,
            session: None,
            paused_offset_ms: None,
            resume_after_call: false,
            dirty: false,
        }
    }

    pub(crate) async fn run(
        mut self,
        recovered: Option<PlaybackSnapshot>,
        mut commands: mpsc::Receiver<Command>,
        mut decoder_events: mpsc::UnboundedReceiver<DecoderEvent>,
        mut notices: mpsc::UnboundedReceiver<DownloadEvent>,
    ) {
        if let Some(snapshot) = recovered {
            self.restore(snapshot).await;
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.dispatch(command).await,
                    None => {
                        debug!("All player handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(event) = decoder_events.recv() => self.on_decoder_event(event).await,
                Some(notice) = notices.recv() => self.on_download_event(notice).await,
            }

            if self.dirty {
                self.save().await;
            }
        }

        info!("Player controller stopped");
    }

    async fn dispatch(&mut self, command: Command) {
        if !command.is_query() {
            debug!(?command, "Applying command");
        }

        match command {
            Command::Play(reply) => {
                self.play().await;
                let _ = reply.send(());
            }
            Command::Pause(reply) => {
                self.pause().await;
                let _ = reply.send(());
            }
            Command::Unpause(reply) => {
                self.unpause().await;
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.stop().await;
                let _ = reply.send(());
            }
            Command::Seek { position_ms, reply } => {
                self.seek(position_ms).await;
                let _ = reply.send(());
            }
            Command::Next(reply) => {
                self.next().await;
                let _ = reply.send(());
            }
            Command::Previous(reply) => {
                self.previous().await;
                let _ = reply.send(());
            }
            Command::Jump { position, reply } => {
                self.jump(position).await;
                let _ = reply.send(());
            }
            Command::Insert {
                track_id,
                position,
                reply,
            } => {
                self.insert(track_id, position).await;
                let _ = reply.send(());
            }
            Command::Prepend { track_id, reply } => {
                self.insert(track_id, 0).await;
                let _ = reply.send(());
            }
            Command::Append { track_id, reply } => {
                let end = self.queue.len() as i32;
                self.insert(track_id, end).await;
                let _ = reply.send(());
            }
            Command::InsertNext { track_id, reply } => {
                let next = self.queue.position() + 1;
                self.insert(track_id, next).await;
                let _ = reply.send(());
            }
            Command::Remove { position, reply } => {
                self.remove(position).await;
                let _ = reply.send(());
            }
            Command::Move { from, to, reply } => {
                self.move_item(from, to).await;
                let _ = reply.send(());
            }
            Command::Clear(reply) => {
                self.clear().await;
                let _ = reply.send(());
            }
            Command::Playlist(reply) => {
                let _ = reply.send(self.queue.tracks().to_vec());
            }
            Command::Position(reply) => {
                let _ = reply.send(self.queue.position());
            }
            Command::Tell(reply) => {
                let _ = reply.send(self.tell().await);
            }
            Command::Duration(reply) => {
                let _ = reply.send(self.duration().await);
            }
            Command::State(reply) => {
                let _ = reply.send(self.state);
            }
            Command::SongAt { position, reply } => {
                let _ = reply.send(self.queue.song_at(position));
            }
            Command::PositionOf { track_id, reply } => {
                let _ = reply.send(self.queue.position_of(track_id));
            }
            Command::PeekNext(reply) => {
                let _ = reply.send(self.queue.peek_next());
            }
            Command::Downloads(reply) => {
                let _ = reply.send(self.downloads.tracked());
            }
            Command::CallState(state) => self.on_call_state(state).await,
            Command::ConnectivityRestored => {
                self.downloads.resume_downloads().await;
            }
            Command::Shutdown(reply) => {
                // Handled by the run loop.
                let _ = reply.send(());
            }
        }
    }

    // ========================================================================
    // Transport controls
    // ========================================================================

    async fn play(&mut self) {
        match self.state {
            PlayState::Paused => self.unpause().await,
            PlayState::Playing | PlayState::Preparing => {}
            PlayState::Stopped => {
                if self.queue.position() < 0 {
                    if self.queue.is_empty() {
                        debug!("Nothing to play");
                        return;
                    }
                    self.queue.set_position(0);
                    self.dirty = true;
                }

                if self.start_playback(false).await {
                    self.emit_play();
                }
            }
        }
    }

    async fn pause(&mut self) {
        match self.state {
            PlayState::Playing => {
                if let Err(e) = self.decoder.pause().await {
                    warn!(error = %e, "Decoder refused to pause");
                }
                let position_ms = self.tell().await;
                self.set_state(PlayState::Paused);
                self.hub.emit_move(MoveEvent::Pause { position_ms });
            }
            PlayState::Preparing => {
                // Stays primed when the prepared callback arrives.
                self.set_state(PlayState::Paused);
                self.hub.emit_move(MoveEvent::Pause { position_ms: 0 });
            }
            PlayState::Paused | PlayState::Stopped => {}
        }
    }

    async fn unpause(&mut self) {
        if self.state != PlayState::Paused {
            return;
        }

        let prepared = self.session.as_ref().map(|session| session.prepared);
        match prepared {
            Some(true) => {
                if let Err(e) = self.decoder.start().await {
                    warn!(error = %e, "Decoder refused to start");
                    self.skip_current().await;
                    return;
                }
                self.set_state(PlayState::Playing);
            }
            Some(false) => self.set_state(PlayState::Preparing),
            None => {
                // Recovered pause: the decoder has nothing loaded, start over.
                if !self.start_playback(false).await {
                    return;
                }
            }
        }

        self.paused_offset_ms = None;
        self.hub.emit_move(MoveEvent::Unpause);
    }

    async fn stop(&mut self) {
        self.teardown().await;

        let was = self.state;
        self.set_state(PlayState::Stopped);
        self.paused_offset_ms = None;
        self.hub.clear_buffer();

        if was != PlayState::Stopped {
            self.hub.emit_move(MoveEvent::Stop);
        }
    }

    async fn seek(&mut self, position_ms: u64) {
        let prepared = self.session.as_ref().is_some_and(|session| session.prepared);
        if !prepared || !matches!(self.state, PlayState::Playing | PlayState::Paused) {
            debug!(position_ms, "Seek ignored, nothing prepared");
            return;
        }

        match self.decoder.seek_to(position_ms).await {
            Ok(()) => {
                self.hub.emit_move(MoveEvent::Seek { position_ms });
            }
            Err(e) => warn!(position_ms, error = %e, "Seek failed"),
        }
    }

    #[instrument(skip(self))]
    async fn jump(&mut self, position: i32) {
        if position < -1 || position >= self.queue.len() as i32 {
            debug!(len = self.queue.len(), "Jump out of range");
            return;
        }

        if position == -1 {
            if self.state.is_outputting() {
                self.stop().await;
            }
            self.queue.set_position(-1);
            self.dirty = true;
            return;
        }

        self.queue.set_position(position);
        self.dirty = true;

        if let Some(track_id) = self.queue.current() {
            self.hub.emit_move(MoveEvent::Jump { position, track_id });
        }

        let was = self.state;
        let keep_paused = was == PlayState::Paused;
        if !self.start_playback(keep_paused).await && was == PlayState::Stopped {
            // Nothing in the rest of the queue could be opened. `stop()` only
            // reports a transition, so close out the Jump explicitly.
            self.hub.emit_move(MoveEvent::Stop);
        }
        self.prefetch().await;
    }

    async fn next(&mut self) {
        let next = self.queue.peek_next();
        if next >= 0 {
            self.jump(next).await;
        } else {
            debug!("End of queue");
            self.stop().await;
            self.queue.set_position(-1);
            self.dirty = true;
        }
    }

    async fn previous(&mut self) {
        if self.queue.is_empty() {
            self.stop().await;
            self.queue.set_position(-1);
            self.dirty = true;
            return;
        }

        if self.state.is_playing() {
            let elapsed = self.tell().await.max(0) as u64;
            if elapsed < self.config.restart_threshold_ms() {
                let prepared = self.session.as_ref().is_some_and(|session| session.prepared);
                if prepared {
                    self.seek(0).await;
                }
                return;
            }
        }

        let position = self.queue.position();
        let target = if position <= 0 {
            self.queue.len() as i32 - 1
        } else {
            position - 1
        };
        self.jump(target).await;
    }

    // ========================================================================
    // Queue mutations
    // ========================================================================

    async fn insert(&mut self, track_id: TrackId, position: i32) {
        if !self.queue.insert(track_id, position) {
            debug!(track_id, position, "Insert out of range");
            return;
        }
        self.dirty = true;
        self.hub.emit_change(ChangeEvent::Insert { position, track_id });

        if self.state == PlayState::Stopped {
            self.queue.set_position(position);
            self.play().await;
        } else if position == self.queue.position() + 1 {
            self.prefetch().await;
        }
    }

    async fn remove(&mut self, position: i32) {
        let Some(track_id) = self.queue.song_at(position) else {
            debug!(position, "Remove out of range");
            return;
        };

        if position == self.queue.position() && self.state.is_outputting() {
            self.stop().await;
        }

        self.queue.remove(position);
        self.dirty = true;
        self.hub.emit_change(ChangeEvent::Remove {
            position,
            track_id,
            current_position: self.queue.position(),
        });
    }

    async fn move_item(&mut self, from: i32, to: i32) {
        let next_before = self.queue.song_at(self.queue.peek_next());
        if !self.queue.move_item(from, to) {
            debug!(from, to, "Move out of range");
            return;
        }
        self.dirty = true;
        self.hub.emit_change(ChangeEvent::Move { from, to });

        if self.queue.song_at(self.queue.peek_next()) != next_before {
            self.prefetch().await;
        }
    }

    async fn clear(&mut self) {
        self.stop().await;
        self.queue.clear();
        self.dirty = true;
        self.hub.emit_change(ChangeEvent::Clear);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    async fn tell(&self) -> i64 {
        match self.state {
            PlayState::Stopped => -1,
            PlayState::Preparing => 0,
            PlayState::Playing | PlayState::Paused => {
                let prepared = self.session.as_ref().is_some_and(|session| session.prepared);
                if prepared {
                    self.decoder.current_position_ms().await as i64
                } else {
                    self.paused_offset_ms.unwrap_or(0) as i64
                }
            }
        }
    }

    async fn duration(&self) -> i64 {
        let prepared = self.session.as_ref().is_some_and(|session| session.prepared);
        if !prepared {
            return -1;
        }
        self.decoder
            .duration_ms()
            .await
            .map(|ms| ms as i64)
            .unwrap_or(-1)
    }

    // ========================================================================
    // Playback plumbing
    // ========================================================================

    fn set_state(&mut self, state: PlayState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "Player state");
            self.state = state;
            self.dirty = true;
            self.published.send_replace(state);
        }
    }

    fn emit_play(&self) {
        if let Some(track_id) = self.queue.current() {
            self.hub.emit_move(MoveEvent::Play {
                position: self.queue.position(),
                track_id,
            });
        }
    }

    /// Unload the current decoder source, if any.
    async fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        if let Err(e) = self.decoder.stop().await {
            debug!(track_id = session.track_id, error = %e, "Decoder stop failed");
        }
        if let Err(e) = self.decoder.reset().await {
            warn!(track_id = session.track_id, error = %e, "Decoder reset failed");
        }
    }

    /// Load the track at the cursor into the decoder, moving forward past
    /// tracks that cannot be opened. Returns `false` if the end of the queue
    /// was reached, in which case playback is stopped and nothing is
    /// selected.
    async fn start_playback(&mut self, paused: bool) -> bool {
        self.teardown().await;

        loop {
            let Some(track_id) = self.queue.current() else {
                self.stop().await;
                return false;
            };

            match self.open_track(track_id).await {
                Ok(session) => {
                    info!(track_id, position = self.queue.position(), "Preparing track");
                    self.session = Some(session);
                    self.paused_offset_ms = None;
                    self.set_state(if paused {
                        PlayState::Paused
                    } else {
                        PlayState::Preparing
                    });
                    return true;
                }
                Err(e) => {
                    warn!(track_id, error = %e, "Skipping track that could not be opened");
                    if e.is_storage_error() {
                        self.hub.emit_download(DownloadEvent::Error {
                            track_id,
                            message: e.to_string(),
                            retryable: false,
                        });
                    }

                    let next = self.queue.peek_next();
                    if next < 0 {
                        self.stop().await;
                        self.queue.set_position(-1);
                        self.dirty = true;
                        return false;
                    }
                    self.queue.set_position(next);
                    self.dirty = true;
                }
            }
        }
    }

    async fn open_track(&mut self, track_id: TrackId) -> Result<Session> {
        let (track, source) = self.materialize(track_id).await?;

        let id = DecoderSession::new();
        let path = source.path().clone();
        self.decoder
            .set_source(id, source)
            .await
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;
        self.decoder
            .prepare_async()
            .await
            .map_err(|e| PlaybackError::Decode(e.to_string()))?;

        Ok(Session {
            id,
            track_id,
            key: CacheKey::from(&track),
            path,
            prepared: false,
        })
    }

    /// Resolve a track to a playable file: the committed cache file, or a
    /// growing file fed by a (possibly resumed) download.
    async fn materialize(&mut self, track_id: TrackId) -> Result<(TrackInfo, DecoderSource)> {
        let track = self
            .catalog
            .lookup(track_id)
            .await?
            .ok_or(PlaybackError::TrackNotFound(track_id))?;

        if let Some(path) = self.cache.committed_path(&track).await? {
            self.hub.emit_buffer(track_id, 100);
            return Ok((track, DecoderSource::File { path }));
        }

        let active = self.downloads.active().filter(|d| d.track_id == track_id);
        let (path, percent) = match active {
            Some(download) => (download.destination.clone(), download.progress_percent()),
            None => {
                let path = self.cache.request_storage(&track).await?;
                let resume_offset = self.cache.partial_length(&path).await?;
                self.downloads
                    .start_download(DownloadRequest {
                        track_id,
                        url: track.content_url.clone(),
                        destination: path.clone(),
                        expected_length: track.size_bytes,
                        resume_offset,
                        cache_key: CacheKey::from(&track),
                    })
                    .await;
                let percent = if track.size_bytes > 0 {
                    (resume_offset.min(track.size_bytes) * 100 / track.size_bytes) as u8
                } else {
                    0
                };
                (path, percent)
            }
        };

        self.hub.emit_buffer(track_id, percent);
        let expected_length = track.size_bytes;
        Ok((
            track,
            DecoderSource::Growing {
                path,
                expected_length,
            },
        ))
    }

    /// Start downloading the next queue entry if nothing else is in flight.
    async fn prefetch(&mut self) {
        if !self.config.prefetch || self.downloads.has_active() {
            return;
        }

        let Some(track_id) = self.queue.song_at(self.queue.peek_next()) else {
            return;
        };

        if let Err(e) = self.prefetch_track(track_id).await {
            debug!(track_id, error = %e, "Prefetch skipped");
        }
    }

    async fn prefetch_track(&mut self, track_id: TrackId) -> Result<()> {
        let track = self
            .catalog
            .lookup(track_id)
            .await?
            .ok_or(PlaybackError::TrackNotFound(track_id))?;

        if self.cache.committed_path(&track).await?.is_some() {
            return Ok(());
        }

        let path = self.cache.request_storage(&track).await?;
        let resume_offset = self.cache.partial_length(&path).await?;

        debug!(track_id, resume_offset, "Prefetching next track");
        self.downloads
            .start_download(DownloadRequest {
                track_id,
                url: track.content_url.clone(),
                destination: path,
                expected_length: track.size_bytes,
                resume_offset,
                cache_key: CacheKey::from(&track),
            })
            .await;
        Ok(())
    }

    /// Drop the current track and advance.
    async fn skip_current(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = self.decoder.reset().await {
                warn!(track_id = session.track_id, error = %e, "Decoder reset failed");
            }
        }
        self.next().await;
    }

    // ========================================================================
    // Decoder callbacks
    // ========================================================================

    async fn on_decoder_event(&mut self, event: DecoderEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(kind = ?event.kind, "Decoder event without a session");
            return;
        };
        if session.id != event.session {
            debug!(kind = ?event.kind, "Dropping decoder event from replaced source");
            return;
        }
        let track_id = session.track_id;

        match event.kind {
            DecoderEventKind::Prepared => {
                session.prepared = true;
                match self.state {
                    PlayState::Preparing => {
                        if let Err(e) = self.decoder.start().await {
                            warn!(track_id, error = %e, "Decoder refused to start");
                            self.skip_current().await;
                            return;
                        }
                        self.set_state(PlayState::Playing);
                    }
                    PlayState::Paused => debug!(track_id, "Prepared while paused"),
                    PlayState::Playing | PlayState::Stopped => {}
                }
            }
            DecoderEventKind::Completion => {
                info!(track_id, "Track completed");
                self.skip_current().await;
            }
            DecoderEventKind::Error { code, message } => {
                warn!(track_id, code, error = %message, "Decode error, skipping track");

                if let Some(download) = self.downloads.snapshot(track_id) {
                    if download.state.is_paused() || download.state.is_permanent_failure() {
                        let cause = download.last_error.unwrap_or_default();
                        self.hub.emit_download(DownloadEvent::Error {
                            track_id,
                            message: format!("playback failed ({}): {}", message, cause),
                            retryable: download.state.is_paused(),
                        });
                    }
                }

                self.skip_current().await;
            }
            DecoderEventKind::BufferingUpdate { percent } => {
                self.hub.emit_buffer(track_id, percent);
            }
        }
    }

    // ========================================================================
    // Download notices
    // ========================================================================

    async fn on_download_event(&mut self, event: DownloadEvent) {
        self.hub.emit_download(event.clone());

        let current = self.session.as_ref().map(|session| session.track_id);

        match event {
            DownloadEvent::Progress {
                track_id,
                downloaded_bytes,
                total_bytes,
            } if current == Some(track_id) && total_bytes > 0 => {
                let percent = (downloaded_bytes.min(total_bytes) * 100 / total_bytes) as u8;
                self.hub.emit_buffer(track_id, percent);
            }
            DownloadEvent::Finish { track_id } => {
                if current == Some(track_id) {
                    self.hub.emit_buffer(track_id, 100);
                }
                self.prefetch().await;
            }
            DownloadEvent::Error {
                track_id,
                retryable: false,
                ..
            } => {
                self.release_failed(track_id).await;
                if current == Some(track_id) {
                    info!(track_id, "Download failed permanently, skipping track");
                    self.skip_current().await;
                }
            }
            DownloadEvent::Cancel { track_id } => self.release_superseded(track_id).await,
            _ => {}
        }
    }

    /// Drop the allocation of a transfer that was superseded or stopped,
    /// unless the track has been picked up again since.
    async fn release_superseded(&mut self, track_id: TrackId) {
        let Some(request) = self.downloads.request_for(track_id) else {
            return;
        };

        let in_use = self
            .downloads
            .active()
            .is_some_and(|active| active.destination == request.destination)
            || self
                .session
                .as_ref()
                .is_some_and(|session| session.path == request.destination);
        if in_use {
            debug!(track_id, "Cancelled transfer target still in use");
            return;
        }

        if let Err(e) = self
            .cache
            .release_storage(&request.cache_key, &request.destination)
            .await
        {
            warn!(track_id, error = %e, "Failed to release cache storage");
        }
    }

    async fn release_failed(&mut self, track_id: TrackId) {
        let target = match self.session.as_ref().filter(|s| s.track_id == track_id) {
            Some(session) => Some((session.key.clone(), session.path.clone())),
            None => self
                .downloads
                .request_for(track_id)
                .map(|request| (request.cache_key, request.destination)),
        };

        if let Some((key, path)) = target {
            if let Err(e) = self.cache.release_storage(&key, &path).await {
                warn!(track_id, error = %e, "Failed to release cache storage");
            }
        }
    }

    // ========================================================================
    // Signals
    // ========================================================================

    async fn on_call_state(&mut self, state: CallState) {
        if state.interrupts_playback() {
            if self.state.is_playing() {
                info!(?state, "Pausing for call");
                self.pause().await;
                self.resume_after_call = true;
            }
        } else if state == CallState::Idle && self.resume_after_call {
            info!("Call ended, resuming");
            self.resume_after_call = false;
            self.unpause().await;
        }
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    fn snapshot(&self, paused_offset_ms: i64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            tracks: self.queue.tracks().to_vec(),
            position: self.queue.position(),
            playing: self.state.is_outputting(),
            paused: self.state == PlayState::Paused,
            paused_offset_ms: paused_offset_ms.clamp(0, i32::MAX as i64) as i32,
        }
    }

    async fn save(&mut self) {
        let offset = if self.state == PlayState::Paused {
            self.tell().await
        } else {
            0
        };
        let snapshot = self.snapshot(offset);

        match self.persistence.save(&snapshot).await {
            Ok(()) => self.dirty = false,
            Err(e) => warn!(error = %e, "Failed to save playback state"),
        }
    }

    async fn restore(&mut self, snapshot: PlaybackSnapshot) {
        self.queue = PlaylistQueue::from_parts(snapshot.tracks, snapshot.position);

        if !snapshot.playing || self.queue.position() < 0 {
            return;
        }

        if snapshot.paused {
            // Not prepared: unpause restarts the track from the beginning.
            self.state = PlayState::Paused;
            self.published.send_replace(PlayState::Paused);
            self.paused_offset_ms = Some(snapshot.paused_offset_ms.max(0) as u64);
            info!(
                position = self.queue.position(),
                offset_ms = snapshot.paused_offset_ms,
                "Restored paused session"
            );
        } else if self.start_playback(false).await {
            self.emit_play();
        }
    }

    async fn shutdown(&mut self) {
        self.save().await;
        self.downloads.stop_all_downloads().await;
        self.teardown().await;
        self.hub.clear_buffer();
        info!("Player controller shut down");
    }
}
