//! # Engine Configuration
//!
//! Tunables for the download workers and the playlist controller. Both are
//! normally derived from `core_runtime::config::EngineTuning`.

use core_runtime::config::EngineTuning;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Download worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Minimum time between two progress notices for one transfer.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Read buffer size for the transport stream (in bytes).
    ///
    /// Default: 16 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl DownloadConfig {
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.progress_interval.is_zero() {
            return Err("Progress interval must be greater than zero".to_string());
        }

        if self.chunk_size == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl From<&EngineTuning> for DownloadConfig {
    fn from(tuning: &EngineTuning) -> Self {
        Self {
            progress_interval: tuning.progress_interval,
            chunk_size: tuning.chunk_size,
        }
    }
}

/// Playlist controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// `previous()` restarts the current track instead of moving back while
    /// elapsed time is below this threshold.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold: Duration,

    /// Download the next queue entry while the current one plays.
    ///
    /// Default: true.
    #[serde(default = "default_prefetch")]
    pub prefetch: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            restart_threshold: default_restart_threshold(),
            prefetch: default_prefetch(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_restart_threshold(mut self, threshold: Duration) -> Self {
        self.restart_threshold = threshold;
        self
    }

    pub fn with_prefetch(mut self, enabled: bool) -> Self {
        self.prefetch = enabled;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.restart_threshold.is_zero() {
            return Err("Restart threshold must be greater than zero".to_string());
        }

        Ok(())
    }

    pub(crate) fn restart_threshold_ms(&self) -> u64 {
        self.restart_threshold.as_millis() as u64
    }
}

impl From<&EngineTuning> for PlaybackConfig {
    fn from(tuning: &EngineTuning) -> Self {
        Self {
            restart_threshold: tuning.restart_threshold,
            prefetch: tuning.prefetch,
        }
    }
}

// Default value functions for serde

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_chunk_size() -> usize {
    16 * 1024
}

fn default_restart_threshold() -> Duration {
    Duration::from_secs(10)
}

fn default_prefetch() -> bool {
    true
}
