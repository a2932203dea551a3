//! # Stream Playback Engine
//!
//! Resilient playback of continuous audio streams over a host-provided
//! transport resource.
//!
//! ## Overview
//!
//! This module handles:
//! - Capability probing for a playable stream encoding
//! - Channel resolution to ordered, optionally shuffled relay URIs
//! - The single live playback session and its state machine
//! - Stall debouncing and failover between sources
//! - Volume and mute that survive session rebuilds
//! - A tokio service loop with a non-blocking handle

pub mod capability;
pub mod channels;
pub mod config;
pub mod error;
pub mod player;
pub mod service;
pub mod session;
pub mod stall;
pub mod volume;

pub use capability::{detect, FormatSupport, ProbePolicy};
pub use channels::{Channel, ChannelSelector, ChannelTable, SourceList};
pub use config::PlayerConfig;
pub use error::{PlaybackError, Result};
pub use player::{PlayStatus, PlayerStatus, StreamPlayer};
pub use service::{PlayerHandle, PlayerService};
pub use session::SessionPhase;
pub use stall::STALL_DELAY;
