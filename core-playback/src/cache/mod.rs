//! # Cache Store Module
//!
//! Space-bounded local storage for downloaded tracks.
//!
//! ## Overview
//!
//! Every cache file belongs to one `(source_id, content_id)` pair and moves
//! through two stages:
//! - **Provisional**: storage handed to an in-flight download; not counted as
//!   reusable cache and never evicted.
//! - **Committed**: the byte count matched the catalog size and the catalog
//!   recorded the path and timestamp. Committed entries are eviction
//!   candidates, oldest first.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │             CacheStore                 │
//! │  - request_storage()  (evict + alloc)  │
//! │  - commit_storage()                    │
//! │  - release_storage()                   │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> Catalog          (cached path / timestamp columns)
//!          ├──> FileSystemAccess (files, volume free space)
//!          └──> Clock            (commit timestamps)
//! ```
//!
//! Allocation keeps `leave_free_bytes` free on the volume. When
//! `leave_free_bytes + requested > free`, committed entries are deleted
//! oldest-first, recomputing free space after each deletion, until the
//! shortfall is covered. If it never is, the request fails with
//! [`PlaybackError::OutOfSpace`](crate::PlaybackError::OutOfSpace).

pub mod config;
pub mod mime;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use config::CacheConfig;
pub use stats::CacheStats;
pub use store::CacheStore;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub source_id: i64,
    pub content_id: String,
}

impl CacheKey {
    pub fn new(source_id: i64, content_id: impl Into<String>) -> Self {
        Self {
            source_id,
            content_id: content_id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_id, self.content_id)
    }
}

impl From<&bridge_traits::TrackInfo> for CacheKey {
    fn from(track: &bridge_traits::TrackInfo) -> Self {
        Self::new(track.source_id, track.content_id.clone())
    }
}
