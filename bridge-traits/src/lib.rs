//! # Host Bridge Traits
//!
//! Capability traits the playback engine requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the engine and platform-specific
//! implementations. The engine decides *what* to play, download and cache
//! and *when*; everything that touches the outside world goes through one of
//! these traits.
//!
//! ## Traits
//!
//! ### Content
//! - [`Catalog`](catalog::Catalog) - Track metadata lookup and cache bookkeeping
//! - [`Transport`](transport::Transport) - Resumable byte-stream fetch
//! - [`Decoder`](decoder::Decoder) - Host audio decoder with async callbacks
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O and volume space
//!
//! ### Platform Signals
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity changes
//! - [`CallStateMonitor`](telephony::CallStateMonitor) - Phone call transitions
//! - [`KeepAlive`](background::KeepAlive) - Process/CPU wake lock
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! `Catalog` and `Decoder` have no desktop default; the host always injects
//! them.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should:
//!
//! - Report non-success HTTP statuses as `BridgeError::Http`
//! - Report connectivity problems as `BridgeError::Network`
//! - Include context (paths, URLs) in messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.
//!
//! ## Examples
//!
//! ### Implementing Catalog
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::catalog::{Catalog, CachedContent, TrackId, TrackInfo};
//! use bridge_traits::error::Result;
//!
//! pub struct SqlCatalog {
//!     pool: sqlx::SqlitePool,
//! }
//!
//! #[async_trait]
//! impl Catalog for SqlCatalog {
//!     async fn lookup(&self, track_id: TrackId) -> Result<Option<TrackInfo>> {
//!         // SELECT ... FROM songs WHERE _id = ?
//!         todo!()
//!     }
//!     // ...
//! }
//! ```

pub mod background;
pub mod catalog;
pub mod decoder;
pub mod error;
pub mod network;
pub mod storage;
pub mod telephony;
pub mod time;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::KeepAlive;
pub use catalog::{CachedContent, Catalog, TrackId, TrackInfo};
pub use decoder::{
    Decoder, DecoderEvent, DecoderEventKind, DecoderEventSink, DecoderSession, DecoderSource,
};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::{FileMetadata, FileSystemAccess, VolumeInfo, WriteStream};
pub use telephony::{CallState, CallStateMonitor, CallStateStream};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use transport::{ByteStream, Transport, TransportResponse};
