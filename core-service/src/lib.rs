//! Engine context and lifecycle.
//!
//! [`PlayerService`] is the explicitly constructed engine: `init()` wires the
//! host bridges from an [`EngineConfig`] into the cache, the download manager
//! and the playlist controller, and starts the platform signal watchers.
//! `shutdown()` saves state and releases everything `init()` acquired.
//! There is no global instance; hosts own the service value.
//!
//! Desktop apps typically enable the `desktop-shims` feature, which lets
//! [`EngineConfig`] fall back to the `bridge-desktop` implementations for
//! any bridge the host does not inject.
//!
//! ```ignore
//! use core_service::PlayerService;
//! use core_runtime::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .state_file(data_dir.join("player.state"))
//!     .cache_dir(data_dir.join("cache"))
//!     .catalog(catalog)
//!     .decoder(decoder)
//!     .build()?;
//!
//! let service = PlayerService::init(config).await?;
//! let _client = service.connect_client();
//! service.player().append(42).await?;
//!
//! service.idle_shutdown_requested().await;
//! service.shutdown().await?;
//! ```

pub mod error;
mod session;
mod signals;

pub use error::{Result, ServiceError};
pub use session::ClientSession;

pub use core_playback::{PlayState, PlayerHandle};
pub use core_runtime::config::{EngineConfig, EngineTuning};
pub use core_runtime::events::{
    BufferEvent, ChangeEvent, DownloadEvent, ListenerHub, MoveEvent, Subscription,
};

use bridge_traits::KeepAlive;
use core_playback::{
    spawn_player, CacheConfig, CacheStore, DownloadConfig, PlaybackConfig, PlaybackError,
    PlayerContext,
};
use parking_lot::Mutex;
use session::IdleMonitor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// A running playback engine.
pub struct PlayerService {
    player: PlayerHandle,
    hub: Arc<ListenerHub>,
    keep_alive: Arc<dyn KeepAlive>,
    clients: Arc<watch::Sender<usize>>,
    idle: CancellationToken,
    stop: CancellationToken,
    controller: Mutex<Option<JoinHandle<()>>>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl PlayerService {
    /// Start the engine.
    ///
    /// Acquires the keep-alive for the lifetime of the service, recovers the
    /// saved queue and starts the controller and signal watchers.
    #[instrument(skip(config), fields(cache_dir = %config.cache_dir.display()))]
    pub async fn init(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let EngineConfig {
            state_file,
            cache_dir,
            leave_free_bytes,
            catalog,
            decoder,
            transport,
            file_system,
            network_monitor,
            call_state_monitor,
            keep_alive,
            clock,
            tuning,
            ..
        } = config;

        let cache_config = CacheConfig::new(cache_dir).with_leave_free_bytes(leave_free_bytes);
        cache_config
            .validate()
            .map_err(core_runtime::Error::Config)?;

        keep_alive.acquire().await?;

        let cache = Arc::new(CacheStore::new(
            cache_config,
            Arc::clone(&file_system),
            Arc::clone(&catalog),
            clock,
        ));
        let hub = Arc::new(ListenerHub::new(tuning.subscriber_capacity));

        let started = spawn_player(PlayerContext {
            catalog,
            decoder,
            transport,
            file_system,
            cache,
            hub: Arc::clone(&hub),
            state_file,
            playback: PlaybackConfig::from(&tuning),
            download: DownloadConfig::from(&tuning),
        })
        .await;

        let (player, controller) = match started {
            Ok(started) => started,
            Err(e) => {
                if let Err(release) = keep_alive.release().await {
                    warn!(error = %release, "Failed to release keep-alive");
                }
                return Err(e.into());
            }
        };

        let (clients, clients_rx) = watch::channel(0usize);
        let idle = CancellationToken::new();
        let stop = CancellationToken::new();

        let mut watchers = vec![tokio::spawn(
            IdleMonitor {
                clients: clients_rx,
                states: player.watch_state(),
                delay: tuning.idle_shutdown_delay,
                fired: idle.clone(),
                stop: stop.clone(),
            }
            .run(),
        )];

        if let Some(monitor) = call_state_monitor {
            watchers.push(tokio::spawn(signals::watch_call_state(
                monitor,
                player.clone(),
                stop.clone(),
            )));
        }

        if let Some(monitor) = network_monitor {
            watchers.push(tokio::spawn(signals::watch_network(
                monitor,
                player.clone(),
                stop.clone(),
            )));
        }

        info!(watchers = watchers.len(), "Player service started");

        Ok(Self {
            player,
            hub,
            keep_alive,
            clients: Arc::new(clients),
            idle,
            stop,
            controller: Mutex::new(Some(controller)),
            watchers: Mutex::new(watchers),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Command surface of the player.
    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    /// Listener registry for the Move, Change, Buffer and Download channels.
    pub fn listeners(&self) -> &Arc<ListenerHub> {
        &self.hub
    }

    /// Register a command-surface client; it stays connected until the
    /// returned guard is dropped.
    pub fn connect_client(&self) -> ClientSession {
        ClientSession::new(Arc::clone(&self.clients))
    }

    pub fn client_count(&self) -> usize {
        *self.clients.borrow()
    }

    /// Resolves once the engine has sat idle with no clients for the
    /// configured delay. The host decides whether to call [`shutdown`].
    ///
    /// [`shutdown`]: PlayerService::shutdown
    pub async fn idle_shutdown_requested(&self) {
        self.idle.cancelled().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop the watchers, save state, stop the controller and release the
    /// keep-alive. Calling it again is a no-op.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.stop.cancel();
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for watcher in watchers {
            if let Err(e) = watcher.await {
                warn!(error = %e, "Signal watcher ended abnormally");
            }
        }

        match self.player.shutdown().await {
            Ok(()) | Err(PlaybackError::EngineStopped) => {}
            Err(e) => return Err(e.into()),
        }

        let controller = self.controller.lock().take();
        if let Some(controller) = controller {
            if let Err(e) = controller.await {
                warn!(error = %e, "Player controller ended abnormally");
            }
        }

        self.keep_alive.release().await?;
        info!("Player service stopped");
        Ok(())
    }
}

impl std::fmt::Debug for PlayerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerService")
            .field("clients", &self.client_count())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
