//! # Download Module
//!
//! Single-flight, resumable transfers of track content into cache storage.
//!
//! ## Overview
//!
//! [`DownloadManager`] owns at most one active transfer. Starting a new one
//! supersedes (aborts) whatever is running. Each transfer is a tokio task
//! that streams the [`Transport`](bridge_traits::Transport) body into the
//! destination file, reports throttled progress and, once the byte count
//! matches, hands the file to a [`CommitHook`].
//!
//! Lifecycle notices are published as
//! [`DownloadEvent`](core_runtime::events::DownloadEvent)s on an unbounded
//! channel, in order, so the owner can forward them to listeners and react
//! to failures of the track it is playing.
//!
//! Failed transfers are never retried on a timer. Paused transfers wait for
//! [`DownloadManager::resume_downloads`], which the engine calls when
//! connectivity returns.

pub mod manager;
pub mod state;
mod worker;

pub use manager::{DownloadManager, RETAINED_RECORDS};
pub use state::{Download, DownloadState};

use crate::cache::CacheKey;
use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::TrackId;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies one run of a transfer; a restarted download gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(pub(crate) u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer-{}", self.0)
    }
}

/// Everything a worker needs to fetch one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub track_id: TrackId,
    pub url: String,
    pub destination: PathBuf,
    pub expected_length: u64,
    /// Bytes already on disk; honoured only if the file length agrees.
    pub resume_offset: u64,
    pub cache_key: CacheKey,
}

/// Finalizes a completed transfer.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn commit(&self, key: &CacheKey, path: &Path, expected_length: u64) -> Result<()>;
}
