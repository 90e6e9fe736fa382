//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Listener hub for the four observer channels
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the engine crates depend
//! on. It establishes the logging conventions, the bridge wiring and the
//! event broadcasting used by remote observers.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
