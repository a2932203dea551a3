//! Host media capability abstractions.
//!
//! The capability probe in the core asks the host which encodings its media
//! primitive can play, and consults a [`HostProfile`] to apply host-specific
//! workarounds (mobile hosts, known-defective browser builds).

use serde::{Deserialize, Serialize};

/// Answer returned by a host when asked whether it can play a MIME type.
///
/// Mirrors the three-valued answer media elements give: an empty answer means
/// "no", otherwise the host is either guessing (`Maybe`) or confident
/// (`Probably`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecSupport {
    No,
    Maybe,
    Probably,
}

impl CodecSupport {
    /// Interpret a raw host answer (`""`, `"maybe"`, `"probably"`).
    ///
    /// Anything unrecognised is treated as unsupported.
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_ascii_lowercase().as_str() {
            "probably" => CodecSupport::Probably,
            "maybe" => CodecSupport::Maybe,
            _ => CodecSupport::No,
        }
    }

    /// Returns `true` if the host claims it may be able to play the type.
    pub fn is_playable(self) -> bool {
        matches!(self, CodecSupport::Maybe | CodecSupport::Probably)
    }
}

/// Capability probe exposed by the host media primitive.
pub trait MediaCapabilities: Send + Sync {
    /// Report whether the given MIME type (optionally with a `codecs` parameter)
    /// can be played by the host.
    fn can_play_type(&self, mimetype: &str) -> CodecSupport;
}

/// Identification of the host environment.
///
/// Only the user agent is used today; probe policies match case-insensitive
/// markers against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostProfile {
    /// Host user agent string.
    pub user_agent: String,
}

impl HostProfile {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Returns `true` if the user agent contains `marker` (case-insensitive).
    pub fn contains(&self, marker: &str) -> bool {
        self.user_agent
            .to_lowercase()
            .contains(&marker.to_lowercase())
    }

    /// Returns `true` if any marker matches.
    pub fn matches_any<S: AsRef<str>>(&self, markers: &[S]) -> bool {
        markers.iter().any(|m| self.contains(m.as_ref()))
    }

    /// Returns `true` if every marker matches. An empty rule never matches.
    pub fn matches_all<S: AsRef<str>>(&self, markers: &[S]) -> bool {
        !markers.is_empty() && markers.iter().all(|m| self.contains(m.as_ref()))
    }
}
