//! # Playback Error Types
//!
//! Errors raised inside the playback core. The public engine surface never
//! returns these to callers; they are logged and converted into
//! [`PlayerEvent::Error`](core_runtime::events::PlayerEvent::Error) where a
//! caller needs to know.

use bridge_traits::BridgeError;
use core_runtime::events::FailureReason;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// No encoding playable by the host was found.
    #[error("Stream playback is not supported on this host")]
    Unsupported,

    /// Selector matched neither a channel id nor an alias.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// `play()` was requested with an empty source list.
    #[error("No stream sources configured")]
    NoSources,

    /// The transport resource failed.
    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    /// Player configuration is invalid.
    #[error("Invalid player configuration: {0}")]
    Config(String),

    /// The async driver has stopped.
    #[error("Player service has shut down")]
    ServiceClosed,

    /// Runtime infrastructure error.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl PlaybackError {
    /// The failure reason reported to listeners for this error.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            PlaybackError::Unsupported => FailureReason::Unsupported,
            PlaybackError::NoSources => FailureReason::NoSources,
            _ => FailureReason::Transport,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
