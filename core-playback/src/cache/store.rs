//! # Cache Store
//!
//! Allocates, commits and evicts cache files under a "leave N bytes free"
//! policy. See the [module docs](super) for the entry lifecycle.

use crate::cache::{mime, CacheConfig, CacheKey, CacheStats};
use crate::download::CommitHook;
use crate::error::{PlaybackError, Result};
use async_trait::async_trait;
use bridge_traits::{CachedContent, Catalog, Clock, FileSystemAccess, TrackInfo};
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
struct ProvisionalEntry {
    path: PathBuf,
    size_bytes: u64,
}

/// Local cache of downloaded tracks.
pub struct CacheStore {
    config: CacheConfig,
    fs: Arc<dyn FileSystemAccess>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    /// Serializes evict-then-allocate so two requests never race on free space.
    alloc_lock: tokio::sync::Mutex<()>,
    provisional: Mutex<HashMap<CacheKey, ProvisionalEntry>>,
}

impl CacheStore {
    pub fn new(
        config: CacheConfig,
        fs: Arc<dyn FileSystemAccess>,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            fs,
            catalog,
            clock,
            alloc_lock: tokio::sync::Mutex::new(()),
            provisional: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Deterministic cache path for an entry: `<base>/<source_id>/<content_id><ext>`.
    pub fn path_for(&self, key: &CacheKey, mime_type: &str) -> Result<PathBuf> {
        let ext = mime::extension_for(mime_type)
            .ok_or_else(|| PlaybackError::UnknownMimeType(mime_type.to_string()))?;

        Ok(self
            .config
            .base_dir
            .join(key.source_id.to_string())
            .join(format!("{}{}", key.content_id, ext)))
    }

    /// Returns the cached path if the catalog has one and the file on disk
    /// has the full expected length.
    pub async fn committed_path(&self, track: &TrackInfo) -> Result<Option<PathBuf>> {
        let Some(path) = track.cached_path.as_ref() else {
            return Ok(None);
        };

        match self.fs.file_len(path).await? {
            Some(len) if len == track.size_bytes => Ok(Some(path.clone())),
            Some(len) => {
                debug!(
                    track_id = track.track_id,
                    expected = track.size_bytes,
                    actual = len,
                    "Cached file has wrong length"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Allocate storage for a track's download, evicting committed entries
    /// if the volume would otherwise drop below the free-space headroom.
    ///
    /// Bytes already present in a partial file count toward the request.
    #[instrument(skip(self, track), fields(track_id = track.track_id))]
    pub async fn request_storage(&self, track: &TrackInfo) -> Result<PathBuf> {
        let key = CacheKey::from(track);
        let path = self.path_for(&key, &track.mime_type)?;

        let _guard = self.alloc_lock.lock().await;

        let free = self.available_bytes().await?;
        let existing = self.fs.file_len(&path).await?.unwrap_or(0);
        let requested = track.size_bytes.saturating_sub(existing);

        self.evict_for(&key, requested, free).await?;

        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent).await?;
        }

        self.provisional.lock().insert(
            key.clone(),
            ProvisionalEntry {
                path: path.clone(),
                size_bytes: track.size_bytes,
            },
        );

        debug!(
            entry = %key,
            file = %strip_path(&path),
            requested,
            "Allocated cache storage"
        );
        Ok(path)
    }

    /// Mark a finished download as committed once its size checks out.
    #[instrument(skip(self, path))]
    pub async fn commit_storage(
        &self,
        key: &CacheKey,
        path: &Path,
        expected_length: u64,
    ) -> Result<()> {
        let actual = self.fs.file_len(path).await?.unwrap_or(0);
        if actual != expected_length {
            warn!(
                entry = %key,
                expected = expected_length,
                actual,
                "Refusing to commit truncated cache file"
            );
            return Err(PlaybackError::SizeMismatch {
                expected: expected_length,
                actual,
            });
        }

        let cached_at = self.clock.unix_timestamp_millis();
        self.catalog
            .mark_cached(key.source_id, &key.content_id, path, cached_at)
            .await?;
        self.provisional.lock().remove(key);

        info!(entry = %key, bytes = actual, "Committed cache entry");
        Ok(())
    }

    /// Discard an allocation and its partial file. No-op if already gone.
    #[instrument(skip(self, path))]
    pub async fn release_storage(&self, key: &CacheKey, path: &Path) -> Result<()> {
        let was_provisional = self.provisional.lock().remove(key).is_some();

        if self.fs.exists(path).await? {
            self.fs.delete_file(path).await?;
            debug!(entry = %key, file = %strip_path(path), "Released cache storage");
        } else if was_provisional {
            debug!(entry = %key, "Released allocation without a file");
        }

        Ok(())
    }

    /// Occupancy snapshot.
    pub async fn stats(&self) -> Result<CacheStats> {
        let entries = self.catalog.cached_entries().await?;
        let committed_bytes = entries.iter().map(|e| e.size_bytes).sum();

        Ok(CacheStats {
            committed_entries: entries.len(),
            committed_bytes,
            provisional_entries: self.provisional.lock().len(),
        })
    }

    /// Bytes already on disk at `path`, or 0.
    pub async fn partial_length(&self, path: &Path) -> Result<u64> {
        Ok(self.fs.file_len(path).await?.unwrap_or(0))
    }

    /// Expected size of a provisional entry, if one is outstanding.
    pub fn provisional_size(&self, key: &CacheKey) -> Option<u64> {
        self.provisional.lock().get(key).map(|entry| entry.size_bytes)
    }

    async fn available_bytes(&self) -> Result<u64> {
        let volume = self.fs.volume_info(&self.config.base_dir).await?;
        if !volume.mounted {
            return Err(PlaybackError::NoStorageMedium);
        }
        Ok(volume.available_bytes)
    }

    async fn evict_for(&self, key: &CacheKey, requested: u64, mut free: u64) -> Result<()> {
        let needed = self.config.leave_free_bytes.saturating_add(requested);
        if free >= needed {
            return Ok(());
        }

        info!(shortfall = needed - free, requested, "Evicting cache entries to free space");

        let mut candidates = self.catalog.cached_entries().await?;
        candidates.sort_by_key(|entry| entry.cached_at);

        let in_flight: HashSet<CacheKey> = self.provisional.lock().keys().cloned().collect();

        let mut evicted = 0usize;
        for entry in candidates {
            let entry_key = CacheKey::new(entry.source_id, entry.content_id.clone());
            if entry_key == *key || in_flight.contains(&entry_key) {
                continue;
            }

            self.evict_entry(&entry).await?;
            evicted += 1;

            free = self.available_bytes().await?;
            if free >= needed {
                info!(evicted, free, "Eviction complete");
                return Ok(());
            }
        }

        warn!(evicted, free, needed, "Eviction could not cover shortfall");
        Err(PlaybackError::OutOfSpace {
            requested,
            available: free,
        })
    }

    async fn evict_entry(&self, entry: &CachedContent) -> Result<()> {
        if let Err(e) = self.fs.delete_file(&entry.path).await {
            // The file may already be gone; the catalog row still has to go.
            warn!(file = %strip_path(&entry.path), error = %e, "Failed to delete cache file");
        }

        self.catalog
            .clear_cached(entry.source_id, &entry.content_id)
            .await?;

        debug!(
            source_id = entry.source_id,
            content_id = %entry.content_id,
            bytes = entry.size_bytes,
            "Evicted cache entry"
        );
        Ok(())
    }
}

#[async_trait]
impl CommitHook for CacheStore {
    async fn commit(&self, key: &CacheKey, path: &Path, expected_length: u64) -> Result<()> {
        self.commit_storage(key, path, expected_length).await
    }
}
