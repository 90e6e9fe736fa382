//! Command surface of the controller actor.

use crate::cache::{CacheStats, CacheStore};
use crate::controller::command::{Command, Reply};
use crate::controller::PlayState;
use crate::download::Download;
use crate::error::{PlaybackError, Result};
use bridge_traits::{CallState, TrackId};
use core_runtime::events::ListenerHub;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Cloneable handle to the player.
///
/// Every method is a message to the controller task. Methods return once
/// the controller has applied the command; they fail only with
/// [`PlaybackError::EngineStopped`] after the controller has shut down.
/// Out-of-range arguments are accepted and ignored.
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Command>,
    states: watch::Receiver<PlayState>,
    hub: Arc<ListenerHub>,
    cache: Arc<CacheStore>,
}

impl PlayerHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        states: watch::Receiver<PlayState>,
        hub: Arc<ListenerHub>,
        cache: Arc<CacheStore>,
    ) -> Self {
        Self {
            commands,
            states,
            hub,
            cache,
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)
    }

    async fn notify(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::EngineStopped)
    }

    /// Listener registry for the Move, Change, Buffer and Download channels.
    pub fn listeners(&self) -> &Arc<ListenerHub> {
        &self.hub
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Follows every state transition the controller applies, including
    /// ones that emit no Move event. The sender closes when the controller
    /// stops.
    pub fn watch_state(&self) -> watch::Receiver<PlayState> {
        self.states.clone()
    }

    // ---- transport controls ----------------------------------------------

    /// Start the selected track, or the first one if nothing is selected.
    /// Resumes if paused.
    pub async fn play(&self) -> Result<()> {
        self.request(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await
    }

    pub async fn unpause(&self) -> Result<()> {
        self.request(Command::Unpause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.request(|reply| Command::Seek { position_ms, reply }).await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.request(Command::Previous).await
    }

    pub async fn jump(&self, position: i32) -> Result<()> {
        self.request(|reply| Command::Jump { position, reply }).await
    }

    // ---- queue mutations --------------------------------------------------

    pub async fn insert(&self, track_id: TrackId, position: i32) -> Result<()> {
        self.request(|reply| Command::Insert {
            track_id,
            position,
            reply,
        })
        .await
    }

    pub async fn prepend(&self, track_id: TrackId) -> Result<()> {
        self.request(|reply| Command::Prepend { track_id, reply }).await
    }

    pub async fn append(&self, track_id: TrackId) -> Result<()> {
        self.request(|reply| Command::Append { track_id, reply }).await
    }

    /// Insert right after the current track.
    pub async fn insert_next(&self, track_id: TrackId) -> Result<()> {
        self.request(|reply| Command::InsertNext { track_id, reply }).await
    }

    pub async fn remove(&self, position: i32) -> Result<()> {
        self.request(|reply| Command::Remove { position, reply }).await
    }

    pub async fn move_item(&self, from: i32, to: i32) -> Result<()> {
        self.request(|reply| Command::Move { from, to, reply }).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.request(Command::Clear).await
    }

    // ---- queries ----------------------------------------------------------

    pub async fn playlist(&self) -> Result<Vec<TrackId>> {
        self.request(Command::Playlist).await
    }

    pub async fn position(&self) -> Result<i32> {
        self.request(Command::Position).await
    }

    /// Elapsed milliseconds of the current track, or `-1` when neither
    /// playing nor paused.
    pub async fn tell(&self) -> Result<i64> {
        self.request(Command::Tell).await
    }

    /// Duration of the current track in milliseconds, or `-1` if unknown.
    pub async fn duration(&self) -> Result<i64> {
        self.request(Command::Duration).await
    }

    pub async fn state(&self) -> Result<PlayState> {
        self.request(Command::State).await
    }

    pub async fn is_playing(&self) -> Result<bool> {
        Ok(self.state().await?.is_playing())
    }

    pub async fn is_paused(&self) -> Result<bool> {
        Ok(self.state().await? == PlayState::Paused)
    }

    pub async fn is_outputting(&self) -> Result<bool> {
        Ok(self.state().await?.is_outputting())
    }

    pub async fn song_at(&self, position: i32) -> Result<Option<TrackId>> {
        self.request(|reply| Command::SongAt { position, reply }).await
    }

    /// Last queue index holding `track_id`, or `-1`.
    pub async fn position_of(&self, track_id: TrackId) -> Result<i32> {
        self.request(|reply| Command::PositionOf { track_id, reply }).await
    }

    pub async fn peek_next(&self) -> Result<i32> {
        self.request(Command::PeekNext).await
    }

    /// Records of every tracked transfer.
    pub async fn downloads(&self) -> Result<Vec<Download>> {
        self.request(Command::Downloads).await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.cache.stats().await
    }

    // ---- signals ----------------------------------------------------------

    pub async fn notify_call_state(&self, state: CallState) -> Result<()> {
        self.notify(Command::CallState(state)).await
    }

    pub async fn notify_connectivity_restored(&self) -> Result<()> {
        self.notify(Command::ConnectivityRestored).await
    }

    /// Save state, stop transfers and the decoder, then end the controller.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Command::Shutdown).await
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("closed", &self.commands.is_closed())
            .finish_non_exhaustive()
    }
}
