//! # Engine Configuration Module
//!
//! Provides configuration management for the playback engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` instance that holds every bridge and tunable the engine
//! needs. It enforces fail-fast validation so a missing capability is
//! reported before any task is spawned.
//!
//! ## Required Dependencies
//!
//! - `Catalog` - Track metadata and cache bookkeeping
//! - `Decoder` - Host audio decoder
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `Transport` - Content fetch (desktop default: reqwest)
//! - `FileSystemAccess` - Cache and state file I/O (desktop default: tokio fs
//!   with a quota-bounded volume)
//! - `NetworkMonitor` - Connectivity restore signal (desktop default: TCP probe)
//! - `KeepAlive` - Process wake lock (desktop default: in-process flag)
//! - `CallStateMonitor` - Telephony signal (no default)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .state_file("/data/player.state")
//!     .cache_dir("/data/cache")
//!     .catalog(Arc::new(MyCatalog))
//!     .decoder(Arc::new(MyDecoder))
//!     .leave_free_bytes(200 * 1024 * 1024)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    CallStateMonitor, Catalog, Clock, Decoder, FileSystemAccess, KeepAlive, LoggerSink,
    NetworkMonitor, SystemClock, Transport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// Default bytes to keep free on the cache volume (100 MiB)
pub const DEFAULT_LEAVE_FREE_BYTES: u64 = 100 * MIB;
/// Default size of the desktop cache volume (1 GiB)
pub const DEFAULT_CACHE_QUOTA_BYTES: u64 = 1024 * MIB;

/// Engine configuration.
///
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// Location of the persisted queue/position snapshot
    pub state_file: PathBuf,

    /// Base directory for cached audio files
    pub cache_dir: PathBuf,

    /// Size of the cache volume used by the desktop filesystem
    pub cache_quota_bytes: u64,

    /// Space that allocation must leave free on the cache volume
    pub leave_free_bytes: u64,

    /// Track metadata lookup (required)
    pub catalog: Arc<dyn Catalog>,

    /// Audio decoder (required)
    pub decoder: Arc<dyn Decoder>,

    /// Content transport (optional with desktop default)
    pub transport: Arc<dyn Transport>,

    /// File system access (optional with desktop default)
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Telephony monitor (optional)
    pub call_state_monitor: Option<Arc<dyn CallStateMonitor>>,

    /// Wake lock held for the engine lifetime (optional with desktop default)
    pub keep_alive: Arc<dyn KeepAlive>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    /// Host log forwarding
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Timing and sizing knobs
    pub tuning: EngineTuning,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("state_file", &self.state_file)
            .field("cache_dir", &self.cache_dir)
            .field("cache_quota_bytes", &self.cache_quota_bytes)
            .field("leave_free_bytes", &self.leave_free_bytes)
            .field("catalog", &"Catalog { ... }")
            .field("decoder", &"Decoder { ... }")
            .field("transport", &"Transport { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "call_state_monitor",
                &self
                    .call_state_monitor
                    .as_ref()
                    .map(|_| "CallStateMonitor { ... }"),
            )
            .field("keep_alive", &"KeepAlive { ... }")
            .field("tuning", &self.tuning)
            .finish()
    }
}

/// Timing and sizing knobs shared by the engine components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTuning {
    /// Minimum spacing between download progress reports
    pub progress_interval: Duration,

    /// Delay before an idle engine with no clients asks to shut down
    pub idle_shutdown_delay: Duration,

    /// `previous()` restarts the current track when less than this has played
    pub restart_threshold: Duration,

    /// Download the next queue entry once the current one is cached
    pub prefetch: bool,

    /// Queue depth of listener subscriptions
    pub subscriber_capacity: usize,

    /// Read buffer size of download workers
    pub chunk_size: usize,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(500),
            idle_shutdown_delay: Duration::from_secs(120),
            restart_threshold: Duration::from_secs(10),
            prefetch: true,
            subscriber_capacity: 64,
            chunk_size: 16 * 1024,
        }
    }
}

impl EngineTuning {
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be greater than 0ms".to_string(),
            ));
        }

        if self.idle_shutdown_delay.is_zero() {
            return Err(Error::Config(
                "Idle shutdown delay must be greater than 0ms".to_string(),
            ));
        }

        if self.subscriber_capacity == 0 {
            return Err(Error::Config(
                "Subscriber capacity must be greater than 0".to_string(),
            ));
        }

        if self.chunk_size == 0 {
            return Err(Error::Config(
                "Download chunk size must be greater than 0 bytes".to_string(),
            ));
        }

        Ok(())
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - State file and cache directory are not empty
    /// - Cache quota is > 0 and larger than the leave-free threshold
    /// - Tuning values are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.state_file.as_os_str().is_empty() {
            return Err(Error::Config("State file path cannot be empty".to_string()));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory cannot be empty".to_string()));
        }

        if self.cache_quota_bytes == 0 {
            return Err(Error::Config(
                "Cache quota must be greater than 0 bytes".to_string(),
            ));
        }

        if self.leave_free_bytes >= self.cache_quota_bytes {
            return Err(Error::Config(format!(
                "Leave-free threshold ({} bytes) must be smaller than the cache quota ({} bytes)",
                self.leave_free_bytes, self.cache_quota_bytes
            )));
        }

        self.tuning.validate()
    }
}

fn catalog_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Catalog".to_string(),
        message: "Catalog implementation is required for track lookup. \
                 Inject the host content database adapter with .catalog()."
            .to_string(),
    }
}

fn decoder_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "Decoder".to_string(),
        message: "Decoder implementation is required for audio output. \
                 Inject the platform media player adapter with .decoder()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_transport() -> Result<Arc<dyn Transport>> {
    use bridge_desktop::ReqwestTransport;

    let transport = ReqwestTransport::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default Transport: {}", e))
    })?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_transport() -> Result<Arc<dyn Transport>> {
    Err(Error::CapabilityMissing {
        capability: "Transport".to_string(),
        message: "Transport implementation is required for downloads. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestTransport. \
                 Mobile: inject the platform HTTP stack."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(
    cache_dir: &std::path::Path,
    quota_bytes: u64,
) -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    Ok(Arc::new(TokioFileSystem::with_quota(cache_dir, quota_bytes)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(
    _cache_dir: &std::path::Path,
    _quota_bytes: u64,
) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the cache and state file. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject sandboxed storage access."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_keep_alive() -> Result<Arc<dyn KeepAlive>> {
    Ok(Arc::new(bridge_desktop::ProcessKeepAlive::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_keep_alive() -> Result<Arc<dyn KeepAlive>> {
    Err(Error::CapabilityMissing {
        capability: "KeepAlive".to_string(),
        message: "KeepAlive implementation is required to hold the process awake. \
                 Desktop: ensure the 'desktop-shims' feature is enabled. \
                 Mobile: inject a wake lock / background audio adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    Some(Arc::new(bridge_desktop::DesktopNetworkMonitor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    None
}

/// Builder for constructing [`EngineConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](EngineConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct EngineConfigBuilder {
    state_file: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    cache_quota_bytes: Option<u64>,
    leave_free_bytes: Option<u64>,
    catalog: Option<Arc<dyn Catalog>>,
    decoder: Option<Arc<dyn Decoder>>,
    transport: Option<Arc<dyn Transport>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    call_state_monitor: Option<Arc<dyn CallStateMonitor>>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    tuning: EngineTuning,
}

impl EngineConfigBuilder {
    /// Sets the state file path.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::EngineConfig;
    ///
    /// let builder = EngineConfig::builder()
    ///     .state_file("/data/player.state");
    /// ```
    pub fn state_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_file = Some(path.into());
        self
    }

    /// Sets the cache directory.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the size of the cache volume.
    ///
    /// Only used by the default desktop filesystem. Default: 1 GiB
    pub fn cache_quota_bytes(mut self, bytes: u64) -> Self {
        self.cache_quota_bytes = Some(bytes);
        self
    }

    /// Sets how many bytes allocation must leave free.
    ///
    /// Default: 100 MiB
    pub fn leave_free_bytes(mut self, bytes: u64) -> Self {
        self.leave_free_bytes = Some(bytes);
        self
    }

    /// Sets the catalog implementation (required).
    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the decoder implementation (required).
    pub fn decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the transport implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the network monitor implementation (optional).
    ///
    /// Connectivity restore resumes downloads paused by a network failure.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the call state monitor implementation (optional).
    pub fn call_state_monitor(mut self, monitor: Arc<dyn CallStateMonitor>) -> Self {
        self.call_state_monitor = Some(monitor);
        self
    }

    /// Sets the keep-alive implementation.
    pub fn keep_alive(mut self, keep_alive: Arc<dyn KeepAlive>) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    /// Sets the clock used for cache timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets a logger sink for host log forwarding.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the minimum spacing between download progress reports.
    ///
    /// Default: 500 ms
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.tuning.progress_interval = interval;
        self
    }

    /// Sets the idle shutdown delay.
    ///
    /// Default: 2 minutes
    pub fn idle_shutdown_delay(mut self, delay: Duration) -> Self {
        self.tuning.idle_shutdown_delay = delay;
        self
    }

    /// Sets the `previous()` restart threshold.
    ///
    /// Default: 10 seconds
    pub fn restart_threshold(mut self, threshold: Duration) -> Self {
        self.tuning.restart_threshold = threshold;
        self
    }

    /// Enables or disables prefetching of the next track.
    ///
    /// Default: true
    pub fn prefetch(mut self, enabled: bool) -> Self {
        self.tuning.prefetch = enabled;
        self
    }

    /// Sets the queue depth of listener subscriptions.
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.tuning.subscriber_capacity = capacity;
        self
    }

    /// Sets the download read buffer size.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.tuning.chunk_size = bytes;
        self
    }

    /// Sets all tuning values at once.
    pub fn tuning(mut self, tuning: EngineTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// Returns an error if:
    /// - Required paths or bridges are missing (Catalog, Decoder)
    /// - No default exists for an omitted optional bridge
    /// - Configuration values are invalid
    pub fn build(self) -> Result<EngineConfig> {
        let state_file = self.state_file.ok_or_else(|| {
            Error::Config("State file path is required. Use .state_file() to set it.".to_string())
        })?;

        let cache_dir = self.cache_dir.ok_or_else(|| {
            Error::Config("Cache directory is required. Use .cache_dir() to set it.".to_string())
        })?;

        let catalog = self.catalog.ok_or_else(catalog_missing_error)?;
        let decoder = self.decoder.ok_or_else(decoder_missing_error)?;

        let cache_quota_bytes = self.cache_quota_bytes.unwrap_or(DEFAULT_CACHE_QUOTA_BYTES);

        let transport = match self.transport {
            Some(transport) => transport,
            None => provide_default_transport()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(&cache_dir, cache_quota_bytes)?,
        };

        let keep_alive = match self.keep_alive {
            Some(keep_alive) => keep_alive,
            None => provide_default_keep_alive()?,
        };

        let config = EngineConfig {
            state_file,
            cache_dir,
            cache_quota_bytes,
            leave_free_bytes: self.leave_free_bytes.unwrap_or(DEFAULT_LEAVE_FREE_BYTES),
            catalog,
            decoder,
            transport,
            file_system,
            network_monitor: self
                .network_monitor
                .or_else(provide_default_network_monitor),
            call_state_monitor: self.call_state_monitor,
            keep_alive,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            logger_sink: self.logger_sink,
            tuning: self.tuning,
        };

        config.validate()?;

        Ok(config)
    }
}
