//! # Playback Orchestration
//!
//! Decides what to play, download and cache, and when.
//!
//! ## Overview
//!
//! This crate handles:
//! - The space-bounded local cache with oldest-first eviction ([`cache`])
//! - Single-flight resumable downloads into that cache ([`download`])
//! - The playlist queue and its cursor ([`queue`])
//! - Crash-safe snapshots of the queue and play flags ([`persistence`])
//! - The controller actor that owns queue and player state and drives the
//!   host decoder ([`controller`])
//!
//! Audio decoding, HTTP, the catalog and the file system are host
//! capabilities from `bridge-traits`; events go out through
//! `core_runtime::events::ListenerHub`.

pub mod cache;
pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod persistence;
pub mod queue;

pub use cache::{CacheConfig, CacheKey, CacheStats, CacheStore};
pub use config::{DownloadConfig, PlaybackConfig};
pub use controller::{spawn_player, PlayState, PlayerContext, PlayerHandle};
pub use download::{CommitHook, Download, DownloadManager, DownloadRequest, DownloadState};
pub use error::{PlaybackError, Result};
pub use persistence::{PlaybackSnapshot, StatePersistence, STATE_FORMAT_VERSION};
pub use queue::PlaylistQueue;
