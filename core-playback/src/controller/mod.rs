//! # Playlist Controller
//!
//! Single-writer owner of the queue and the player state.
//!
//! ## Architecture
//!
//! ```text
//!  PlayerHandle ──Command──┐
//!  (any number of clones)  │
//!                          ▼
//!  Decoder ──DecoderEvent──> ┌──────────────┐ ──> ListenerHub
//!                            │ PlayerActor  │ ──> Decoder
//!  DownloadManager ─notice─> │ (one task)   │ ──> CacheStore / DownloadManager
//!                            └──────────────┘ ──> StatePersistence
//! ```
//!
//! Commands, decoder callbacks and download notices all arrive as messages
//! on one tokio task, so queue and player state have exactly one writer.
//! Observers learn about every applied mutation through the
//! [`ListenerHub`], in the order the actor applied them.
//!
//! ## Failure policy
//!
//! Nothing a track does ends the session. A track that cannot be opened,
//! fails to decode or whose download fails permanently is skipped; the
//! failure shows up on the Download channel when it concerns a transfer.

mod actor;
mod command;
mod handle;

pub use handle::PlayerHandle;

use crate::cache::CacheStore;
use crate::config::{DownloadConfig, PlaybackConfig};
use crate::download::DownloadManager;
use crate::error::Result;
use crate::persistence::StatePersistence;
use actor::PlayerActor;
use bridge_traits::{Catalog, Decoder, FileSystemAccess, Transport};
use core_runtime::events::ListenerHub;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

/// Command queue depth between handles and the actor.
const COMMAND_CAPACITY: usize = 64;

/// Player state machine.
///
/// ```text
/// Stopped ──play/jump──> Preparing ──prepared──> Playing
///                           │   ▲                  │ ▲
///                     pause │   │ unpause    pause │ │ unpause
///                           ▼   │                  ▼ │
///                           Paused <───────────────┘
/// any ──stop / end of queue / unrecoverable error──> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayState {
    Stopped,
    Preparing,
    Playing,
    Paused,
}

impl PlayState {
    /// Playing, or about to play once the decoder is prepared.
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Preparing)
    }

    pub fn is_outputting(&self) -> bool {
        !matches!(self, PlayState::Stopped)
    }
}

/// Collaborators the controller is built from.
pub struct PlayerContext {
    pub catalog: Arc<dyn Catalog>,
    pub decoder: Arc<dyn Decoder>,
    pub transport: Arc<dyn Transport>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub cache: Arc<CacheStore>,
    pub hub: Arc<ListenerHub>,
    pub state_file: PathBuf,
    pub playback: PlaybackConfig,
    pub download: DownloadConfig,
}

/// Recover saved state and start the controller task.
///
/// The returned join handle completes after [`PlayerHandle::shutdown`] or
/// once every handle is dropped.
pub async fn spawn_player(context: PlayerContext) -> Result<(PlayerHandle, JoinHandle<()>)> {
    let PlayerContext {
        catalog,
        decoder,
        transport,
        file_system,
        cache,
        hub,
        state_file,
        playback,
        download,
    } = context;

    let (decoder_tx, decoder_rx) = mpsc::unbounded_channel();
    decoder.set_event_sink(decoder_tx);

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let downloads = DownloadManager::new(
        transport,
        Arc::clone(&file_system),
        Arc::clone(&cache) as Arc<dyn crate::download::CommitHook>,
        download,
        notice_tx,
    );

    let persistence = StatePersistence::new(file_system, state_file);
    let recovered = persistence.recover().await?;

    let (state_tx, state_rx) = watch::channel(PlayState::Stopped);
    let actor = PlayerActor::new(
        catalog,
        decoder,
        Arc::clone(&cache),
        downloads,
        persistence,
        Arc::clone(&hub),
        playback,
        state_tx,
    );

    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let task = tokio::spawn(actor.run(recovered, command_rx, decoder_rx, notice_rx));

    info!("Player controller started");
    Ok((PlayerHandle::new(command_tx, state_rx, hub, cache), task))
}
