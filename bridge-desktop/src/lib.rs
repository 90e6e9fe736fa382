//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the host capabilities the player
//! needs that desktop machines can supply without platform glue:
//! - `Transport` using `reqwest` with HTTP range requests
//! - `FileSystemAccess` using `tokio::fs`, with free space measured against
//!   a quota
//! - `NetworkMonitor` using a TCP reachability probe
//! - `KeepAlive` as an in-process flag
//!
//! Decoding and the catalog have no desktop default; desktop has no
//! telephony, so there is no call-state monitor either.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestTransport, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = ReqwestTransport::new().unwrap();
//!     let fs = TokioFileSystem::with_quota("/var/cache/cacheplay", 2 << 30);
//!
//!     // Use in core configuration
//! }
//! ```

mod background;
mod filesystem;
mod network;
mod transport;

pub use background::ProcessKeepAlive;
pub use filesystem::{TokioFileSystem, DEFAULT_QUOTA_BYTES};
pub use network::DesktopNetworkMonitor;
pub use transport::ReqwestTransport;
