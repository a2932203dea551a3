//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback engine:
//! - Logging and tracing infrastructure
//! - Configuration management (host bridge wiring)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback core depends on.
//! It establishes the logging conventions and the typed publish/subscribe
//! registry through which the engine reports its lifecycle to UI collaborators.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
