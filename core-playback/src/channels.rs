//! # Channels and Source Lists
//!
//! Resolves a logical channel (numeric id or friendly alias) to the ordered
//! list of stream URIs a session attaches, one per relay endpoint.

use crate::error::{PlaybackError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Id of the channel used when a selector cannot be resolved.
pub const DEFAULT_CHANNEL_ID: u32 = 5;

/// A broadcast channel and the relay endpoints that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Stable numeric id.
    pub id: u32,
    /// Friendly names, matched case-insensitively.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Endpoint templates, in failover order. The format extension and the
    /// stream query are appended to each.
    pub endpoints: Vec<String>,
}

impl Channel {
    pub fn new(id: u32, aliases: &[&str], endpoints: &[&str]) -> Self {
        Self {
            id,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn answers_to(&self, name: &str) -> bool {
        self.aliases
            .iter()
            .any(|alias| alias.to_lowercase() == name)
    }
}

/// The built-in relay table.
pub fn builtin_channels() -> Vec<Channel> {
    vec![
        Channel::new(1, &["game"], &["https://relay.nerdwave.cc/game"]),
        Channel::new(
            2,
            &["ocr", "ocremix", "oc remix"],
            &["https://relay.nerdwave.cc/ocremix"],
        ),
        Channel::new(3, &["cover", "covers"], &["https://relay.nerdwave.cc/covers"]),
        Channel::new(
            4,
            &["chip", "chiptune", "chiptunes"],
            &["https://relay.nerdwave.cc/chiptune"],
        ),
        Channel::new(5, &["all"], &["https://relay.nerdwave.cc/all"]),
    ]
}

/// How a caller names a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    Id(u32),
    Name(String),
}

impl From<u32> for ChannelSelector {
    fn from(id: u32) -> Self {
        ChannelSelector::Id(id)
    }
}

impl From<&str> for ChannelSelector {
    fn from(name: &str) -> Self {
        ChannelSelector::Name(name.to_string())
    }
}

impl From<String> for ChannelSelector {
    fn from(name: String) -> Self {
        ChannelSelector::Name(name)
    }
}

impl fmt::Display for ChannelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSelector::Id(id) => write!(f, "{}", id),
            ChannelSelector::Name(name) => f.write_str(name),
        }
    }
}

/// Immutable lookup table of channels with a designated fallback.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    channels: Vec<Channel>,
    default_index: usize,
}

impl ChannelTable {
    /// Build a table, validating ids, aliases, endpoints and the default.
    pub fn new(channels: Vec<Channel>, default_id: u32) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut aliases = HashSet::new();

        for channel in &channels {
            if !ids.insert(channel.id) {
                return Err(PlaybackError::Config(format!(
                    "duplicate channel id {}",
                    channel.id
                )));
            }
            if channel.endpoints.is_empty() {
                return Err(PlaybackError::Config(format!(
                    "channel {} has no endpoints",
                    channel.id
                )));
            }
            for alias in &channel.aliases {
                if !aliases.insert(alias.to_lowercase()) {
                    return Err(PlaybackError::Config(format!(
                        "alias '{}' is used by more than one channel",
                        alias
                    )));
                }
            }
        }

        let default_index = channels
            .iter()
            .position(|c| c.id == default_id)
            .ok_or_else(|| {
                PlaybackError::Config(format!("default channel {} is not defined", default_id))
            })?;

        Ok(Self {
            channels,
            default_index,
        })
    }

    /// The built-in relay table with channel 5 as default.
    pub fn builtin() -> Self {
        Self {
            channels: builtin_channels(),
            default_index: 4,
        }
    }

    pub fn get(&self, id: u32) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn default_channel(&self) -> &Channel {
        &self.channels[self.default_index]
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Resolve a selector. Strings that parse as an integer select by id
    /// first, then by alias.
    pub fn resolve(&self, selector: &ChannelSelector) -> Result<&Channel> {
        let found = match selector {
            ChannelSelector::Id(id) => self.get(*id),
            ChannelSelector::Name(name) => {
                let name = name.trim();
                name.parse::<u32>()
                    .ok()
                    .and_then(|id| self.get(id))
                    .or_else(|| {
                        let lowered = name.to_lowercase();
                        self.channels.iter().find(|c| c.answers_to(&lowered))
                    })
            }
        };

        found.ok_or_else(|| PlaybackError::UnknownChannel(selector.to_string()))
    }

    /// Resolve a selector, falling back to the default channel with a warning.
    pub fn resolve_or_default(&self, selector: &ChannelSelector) -> &Channel {
        match self.resolve(selector) {
            Ok(channel) => channel,
            Err(err) => {
                let fallback = self.default_channel();
                warn!(
                    selector = %selector,
                    fallback = fallback.id,
                    "{}, using default channel",
                    err
                );
                fallback
            }
        }
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Build the fully-qualified stream URIs for `channel`, in endpoint order.
pub fn build_uris(channel: &Channel, format_tag: &str, query: &str) -> Vec<String> {
    channel
        .endpoints
        .iter()
        .map(|endpoint| format!("{}.{}{}", endpoint, format_tag, query))
        .collect()
}

/// Uniformly permute `list` in place when `enabled`.
pub fn maybe_shuffle<R: Rng + ?Sized>(list: &mut [String], enabled: bool, rng: &mut R) {
    if enabled {
        list.shuffle(rng);
    }
}

/// Ordered stream URIs for the current channel.
///
/// A single URI and a list of URIs normalize to the same representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceList(Vec<String>);

impl SourceList {
    pub fn new(uris: Vec<String>) -> Self {
        Self(uris)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl From<Vec<String>> for SourceList {
    fn from(uris: Vec<String>) -> Self {
        Self(uris)
    }
}

impl From<String> for SourceList {
    fn from(uri: String) -> Self {
        Self(vec![uri])
    }
}

impl From<&str> for SourceList {
    fn from(uri: &str) -> Self {
        Self(vec![uri.to_string()])
    }
}

impl From<&[&str]> for SourceList {
    fn from(uris: &[&str]) -> Self {
        uris.iter().copied().collect()
    }
}

impl<'a> FromIterator<&'a str> for SourceList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_string).collect())
    }
}
