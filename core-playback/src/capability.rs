//! # Capability Probe
//!
//! One-time detection of the stream encoding the host can play.
//!
//! MP3 is the baseline candidate. Ogg Vorbis overrides it when the host
//! reports support, except on hosts where the probe is known to answer
//! wrongly (mobile-class hosts and the blocklisted ranges in [`ProbePolicy`]).

use bridge_traits::{HostProfile, MediaCapabilities};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A candidate encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// MIME type passed to the host probe.
    pub probe: &'static str,
    /// MIME type attached to each source.
    pub mimetype: &'static str,
    /// Extension appended to endpoint templates.
    pub format_tag: &'static str,
}

pub const MP3: Candidate = Candidate {
    probe: "audio/mpeg",
    mimetype: "audio/mpeg",
    format_tag: "mp3",
};

pub const VORBIS: Candidate = Candidate {
    probe: "audio/ogg; codecs=\"vorbis\"",
    mimetype: "audio/ogg",
    format_tag: "ogg",
};

/// Host-specific overrides for the probe.
///
/// Every marker is matched against the user agent case-insensitively,
/// including version markers such as `Firefox/57`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbePolicy {
    /// User-agent markers of mobile-class hosts; the secondary candidate is skipped.
    #[serde(default = "default_mobile_markers")]
    pub mobile_markers: Vec<String>,

    /// User-agent markers whose secondary probe yields false negatives.
    #[serde(default = "default_secondary_blocklist")]
    pub secondary_blocklist: Vec<String>,

    /// Marker groups identifying hosts that take a long time to start a
    /// stream. Every marker of a group must match.
    #[serde(default = "default_long_load_hosts")]
    pub long_load_hosts: Vec<Vec<String>>,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            mobile_markers: default_mobile_markers(),
            secondary_blocklist: default_secondary_blocklist(),
            long_load_hosts: default_long_load_hosts(),
        }
    }
}

impl ProbePolicy {
    fn skips_secondary(&self, host: &HostProfile) -> bool {
        host.matches_any(self.mobile_markers.as_slice())
            || host.matches_any(self.secondary_blocklist.as_slice())
    }

    fn is_long_load(&self, host: &HostProfile) -> bool {
        self.long_load_hosts
            .iter()
            .any(|group| host.matches_all(group.as_slice()))
    }
}

fn default_mobile_markers() -> Vec<String> {
    vec!["mobile".to_string(), "android".to_string()]
}

fn default_secondary_blocklist() -> Vec<String> {
    vec!["Firefox/57".to_string()]
}

fn default_long_load_hosts() -> Vec<Vec<String>> {
    vec![vec!["Chrome".to_string(), "Android".to_string()]]
}

/// Result of the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSupport {
    pub supported: bool,
    pub mimetype: String,
    pub format_tag: String,
    /// Host is slow to start streams; see [`ProbePolicy::long_load_hosts`].
    pub long_load_host: bool,
}

impl FormatSupport {
    pub fn unsupported(long_load_host: bool) -> Self {
        Self {
            supported: false,
            mimetype: String::new(),
            format_tag: String::new(),
            long_load_host,
        }
    }

    fn from_candidate(candidate: &Candidate, long_load_host: bool) -> Self {
        Self {
            supported: true,
            mimetype: candidate.mimetype.to_string(),
            format_tag: candidate.format_tag.to_string(),
            long_load_host,
        }
    }
}

/// Probe the host for a playable encoding.
pub fn detect(
    capabilities: &dyn MediaCapabilities,
    host: &HostProfile,
    policy: &ProbePolicy,
) -> FormatSupport {
    let long_load_host = policy.is_long_load(host);
    let mut chosen = None;

    if capabilities.can_play_type(MP3.probe).is_playable() {
        chosen = Some(&MP3);
    }

    if policy.skips_secondary(host) {
        debug!(user_agent = %host.user_agent, "Skipping Vorbis probe for this host");
    } else if capabilities.can_play_type(VORBIS.probe).is_playable() {
        chosen = Some(&VORBIS);
    }

    let support = match chosen {
        Some(candidate) => FormatSupport::from_candidate(candidate, long_load_host),
        None => FormatSupport::unsupported(long_load_host),
    };

    info!(
        supported = support.supported,
        format = %support.format_tag,
        long_load_host,
        "Capability probe complete"
    );
    support
}
