//! Cache configuration

use std::path::PathBuf;

/// Default headroom kept free on the cache volume (100 MiB).
pub const DEFAULT_LEAVE_FREE_BYTES: u64 = 100 * 1024 * 1024;

/// Configuration for the [`CacheStore`](super::CacheStore).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory; entries live at `<base_dir>/<source_id>/<content_id><ext>`.
    pub base_dir: PathBuf,

    /// Bytes that must remain free on the volume after an allocation.
    pub leave_free_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("cache"),
            leave_free_bytes: DEFAULT_LEAVE_FREE_BYTES,
        }
    }
}

impl CacheConfig {
    /// Create a configuration rooted at `base_dir` with the default headroom.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Set the base directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set the free-space headroom.
    pub fn with_leave_free_bytes(mut self, bytes: u64) -> Self {
        self.leave_free_bytes = bytes;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_dir.as_os_str().is_empty() {
            return Err("Cache base directory cannot be empty".to_string());
        }

        Ok(())
    }
}
