//! Track Catalog Abstraction
//!
//! The catalog owns track metadata and the cache bookkeeping columns. The
//! engine only ever holds track ids and asks the catalog to resolve them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Opaque catalog identifier of a track.
pub type TrackId = i64;

/// Resolved metadata for a single track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub track_id: TrackId,
    /// Catalog source the track was replicated from
    pub source_id: i64,
    /// Content identifier on the remote source
    pub content_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Expected size of the complete file in bytes
    pub size_bytes: u64,
    pub mime_type: String,
    /// URL the content can be fetched from
    pub content_url: String,
    /// Location of the committed cache file, if any
    pub cached_path: Option<PathBuf>,
    /// Unix timestamp (ms) of the last cache commit
    pub cached_at: Option<i64>,
}

impl TrackInfo {
    /// Whether the catalog believes a committed copy exists.
    pub fn is_cached(&self) -> bool {
        self.cached_path.is_some()
    }
}

/// A committed cache file as recorded by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedContent {
    pub source_id: i64,
    pub content_id: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub cached_at: i64,
}

/// Catalog lookup and cache bookkeeping.
///
/// Implementations are usually backed by the host's content database.
/// Lookups for unknown ids return `Ok(None)` rather than an error.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Resolve a track id to its metadata.
    async fn lookup(&self, track_id: TrackId) -> Result<Option<TrackInfo>>;

    /// List every content item that currently has a committed cache file.
    async fn cached_entries(&self) -> Result<Vec<CachedContent>>;

    /// Record a committed cache file for a content item.
    async fn mark_cached(
        &self,
        source_id: i64,
        content_id: &str,
        path: &Path,
        cached_at: i64,
    ) -> Result<()>;

    /// Forget the cache file for a content item. No-op if none is recorded.
    async fn clear_cached(&self, source_id: i64, content_id: &str) -> Result<()>;
}
