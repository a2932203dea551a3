//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host that embeds it.
//!
//! ## Overview
//!
//! The core never decodes audio and never speaks a streaming protocol. It drives
//! a black-box media primitive owned by the host (an `<audio>` element, a native
//! player object, a test double) through the traits in this crate:
//!
//! ### Playback
//! - [`MediaTransport`](transport::MediaTransport) - One transport resource: attach
//!   sources, start, pause, detach, release
//! - [`TransportFactory`](transport::TransportFactory) - Creates transport resources
//!   bound to a session's signal channel
//! - [`TransportSignal`](transport::TransportSignal) - Low-level events fired by a
//!   transport resource
//!
//! ### Capability Detection
//! - [`MediaCapabilities`](media::MediaCapabilities) - Codec support by MIME type
//! - [`HostProfile`](media::HostProfile) - Host identification used by probe policies
//!
//! ### Utilities
//! - [`LoggerSink`](logger::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their native failures into it and keep the
//! message actionable (which source, which device).
//!
//! ## Threading
//!
//! Transport resources are owned by exactly one session and only ever touched
//! from the engine's event loop, so [`MediaTransport`](transport::MediaTransport)
//! only requires `Send`. Factories and capability probes are shared and must be
//! `Send + Sync`.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::transport::{MediaTransport, SignalSender, StreamSource, TransportFactory};
//! use bridge_traits::error::Result;
//!
//! struct HtmlAudioFactory;
//!
//! impl TransportFactory for HtmlAudioFactory {
//!     fn create(&self, signals: SignalSender) -> Result<Box<dyn MediaTransport>> {
//!         // Wire element listeners to `signals.emit(...)`
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod logger;
pub mod media;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use logger::{LogEntry, LogLevel, LoggerSink};
pub use media::{CodecSupport, HostProfile, MediaCapabilities};
pub use transport::{
    signal_channel, MediaTransport, SessionId, SignalEnvelope, SignalReceiver, SignalSender,
    SignalTx, StreamSource, TransportFactory, TransportSignal,
};
