//! # Core Configuration Module
//!
//! Wires the host bridges the playback engine depends on.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host capabilities and runtime settings for the
//! engine. It enforces fail-fast validation so a missing bridge surfaces at
//! startup rather than on the first `play()`.
//!
//! ## Required Dependencies
//!
//! - `TransportFactory` - Creates the host media primitive driven by the engine
//! - `MediaCapabilities` - Answers codec support queries for the capability probe
//!
//! ## Optional Settings
//!
//! - `HostProfile` - Host identification for probe policies (default: empty user agent)
//! - Event buffer size for the async event stream (default: 100)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use bridge_traits::HostProfile;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .transport_factory(Arc::new(MyTransportFactory))
//!     .media_capabilities(Arc::new(MyCapabilities))
//!     .host(HostProfile::new(user_agent))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HostProfile, MediaCapabilities, TransportFactory};
use std::sync::Arc;

/// Largest accepted event stream buffer.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the playback engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Creates transport resources (required)
    pub transport_factory: Arc<dyn TransportFactory>,

    /// Host codec support probe (required)
    pub media_capabilities: Arc<dyn MediaCapabilities>,

    /// Host identification consulted by probe policies
    pub host: HostProfile,

    /// Buffer size of the async event stream mirror
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("transport_factory", &"TransportFactory { ... }")
            .field("media_capabilities", &"MediaCapabilities { ... }")
            .field("host", &self.host)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn transport_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "TransportFactory".to_string(),
        message: "A TransportFactory implementation is required to create playback resources. \
                 Web: wrap an <audio> element. \
                 Native: wrap the platform media player. \
                 Tests: inject a recording transport double."
            .to_string(),
    }
}

fn media_capabilities_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaCapabilities".to_string(),
        message: "A MediaCapabilities implementation is required to detect playable encodings. \
                 Web: forward to HTMLMediaElement.canPlayType. \
                 Native: report the codecs the platform player supports."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    transport_factory: Option<Arc<dyn TransportFactory>>,
    media_capabilities: Option<Arc<dyn MediaCapabilities>>,
    host: Option<HostProfile>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the transport factory implementation.
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Sets the codec support probe implementation.
    pub fn media_capabilities(mut self, capabilities: Arc<dyn MediaCapabilities>) -> Self {
        self.media_capabilities = Some(capabilities);
        self
    }

    /// Sets the host profile.
    pub fn host(mut self, host: HostProfile) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the buffer size of the async event stream.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityMissing` if a required bridge was not provided, or
    /// `Config` if a setting is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let transport_factory = self
            .transport_factory
            .ok_or_else(transport_factory_missing_error)?;
        let media_capabilities = self
            .media_capabilities
            .ok_or_else(media_capabilities_missing_error)?;

        let config = CoreConfig {
            transport_factory,
            media_capabilities,
            host: self.host.unwrap_or_default(),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;
        Ok(config)
    }
}
