//! Client-side playback engine that plays a queue of remote tracks while
//! downloading and caching them locally.
//!
//! This crate re-exports [`core_service`] so hosts depend on a single crate.
//! Enable the `desktop-shims` feature (on by default) to fall back to the
//! desktop bridge implementations for transport, file system, network
//! monitoring and keep-alive.

pub use core_service::*;

pub use bridge_traits as bridge;
pub use core_playback as playback;
pub use core_runtime as runtime;
