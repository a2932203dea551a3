//! # Player Configuration
//!
//! Settings for the stream player. All fields have serde defaults, so an
//! empty JSON object is a valid configuration.

use crate::capability::ProbePolicy;
use crate::channels::{builtin_channels, Channel, ChannelTable, DEFAULT_CHANNEL_ID};
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Stream player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Channel table.
    ///
    /// Default: the built-in relay channels.
    #[serde(default = "builtin_channels")]
    pub channels: Vec<Channel>,

    /// Channel used on startup and when a selector cannot be resolved.
    ///
    /// Default: 5 (`all`).
    #[serde(default = "default_channel")]
    pub default_channel: u32,

    /// Query string appended to every stream URI (listener id and key).
    ///
    /// Default: empty.
    #[serde(default)]
    pub stream_query: String,

    /// Shuffle the source list once per `play()`.
    ///
    /// Default: false.
    #[serde(default)]
    pub shuffle_sources: bool,

    /// Gain applied to the first session, 0.0 to 1.0.
    ///
    /// Default: 1.0.
    #[serde(default = "default_volume")]
    pub initial_volume: f32,

    /// Capability probe overrides.
    #[serde(default)]
    pub probe: ProbePolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            channels: builtin_channels(),
            default_channel: default_channel(),
            stream_query: String::new(),
            shuffle_sources: false,
            initial_volume: default_volume(),
            probe: ProbePolicy::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| PlaybackError::Config(format!("invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(PlaybackError::Config(
                "initial_volume must be between 0.0 and 1.0".to_string(),
            ));
        }

        self.channel_table().map(|_| ())
    }

    /// Build the channel lookup table.
    pub fn channel_table(&self) -> Result<ChannelTable> {
        ChannelTable::new(self.channels.clone(), self.default_channel)
    }
}

fn default_channel() -> u32 {
    DEFAULT_CHANNEL_ID
}

fn default_volume() -> f32 {
    1.0
}
