//! Transport bridge traits and the low-level signal channel.
//!
//! A transport resource is the host's black-box media primitive: it accepts an
//! ordered list of candidate sources, does all network I/O, buffering and
//! decoding itself, and reports what happens through [`TransportSignal`]s.
//! The core owns at most one resource at a time and drives it exclusively
//! through [`MediaTransport`].

use crate::error::Result;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique identifier for a playback session.
///
/// Every signal a transport resource fires is tagged with the id of the session
/// that created it, which lets the core drop signals from resources it has
/// already torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Low-level events fired by a transport resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Audio output actually started or resumed.
    Playing,
    /// Playback is waiting for data.
    Waiting,
    /// The resource is trying to fetch data but none is arriving.
    Stalled,
    /// The resource stopped fetching data.
    Suspended,
    /// Playback position advanced.
    TimeUpdate,
    /// The source at `index` (in attach order) failed.
    SourceError { index: usize },
    /// The stream reached its end.
    Ended,
    /// Loading was aborted by the host.
    Aborted,
    /// Element-level failure (device, permission, decoder) not tied to a source.
    Error { message: String },
}

impl TransportSignal {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TransportSignal::Playing => "playing",
            TransportSignal::Waiting => "waiting",
            TransportSignal::Stalled => "stalled",
            TransportSignal::Suspended => "suspend",
            TransportSignal::TimeUpdate => "timeupdate",
            TransportSignal::SourceError { .. } => "source-error",
            TransportSignal::Ended => "ended",
            TransportSignal::Aborted => "abort",
            TransportSignal::Error { .. } => "error",
        }
    }
}

/// A signal tagged with the session whose resource fired it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub session: SessionId,
    pub signal: TransportSignal,
}

/// Raw sending half of the engine's signal queue.
pub type SignalTx = mpsc::UnboundedSender<SignalEnvelope>;

/// Receiving half of the engine's signal queue.
pub type SignalReceiver = mpsc::UnboundedReceiver<SignalEnvelope>;

/// Create the queue transport signals travel through.
pub fn signal_channel() -> (SignalTx, SignalReceiver) {
    mpsc::unbounded_channel()
}

/// Session-bound handle a transport resource uses to report signals.
///
/// Emitting never blocks; signals are queued and handled by the engine on a
/// later turn of its event loop.
#[derive(Debug, Clone)]
pub struct SignalSender {
    session: SessionId,
    tx: SignalTx,
}

impl SignalSender {
    pub fn new(session: SessionId, tx: SignalTx) -> Self {
        Self { session, tx }
    }

    /// Session this sender is bound to.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queue a signal. Returns `false` if the engine is gone.
    pub fn emit(&self, signal: TransportSignal) -> bool {
        self.tx
            .send(SignalEnvelope {
                session: self.session,
                signal,
            })
            .is_ok()
    }
}

/// One candidate stream endpoint handed to a transport resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSource {
    /// Position in the session's ordered source list.
    pub index: usize,
    /// Fully-qualified stream URI.
    pub uri: String,
    /// MIME type the host should expect from this source.
    pub mimetype: String,
}

/// A single transport resource.
///
/// The host tries attached sources in attach order and reports failures per
/// source through [`TransportSignal::SourceError`].
pub trait MediaTransport: Send {
    /// Attach a candidate source. Called in source-list order before `start`.
    fn attach_source(&mut self, source: &StreamSource) -> Result<()>;

    /// Apply output gain, normalized to `0.0..=1.0`.
    fn set_volume(&mut self, gain: f32) -> Result<()>;

    /// Kick off playback. Completion is reported asynchronously via signals.
    fn start(&mut self) -> Result<()>;

    /// Halt output.
    fn pause(&mut self) -> Result<()>;

    /// Detach every attached source.
    fn detach_sources(&mut self) -> Result<()>;

    /// Release the resource so that no background buffering continues.
    fn release(&mut self) -> Result<()>;

    /// The source currently being played, if the host knows it.
    fn current_source(&self) -> Option<String> {
        None
    }
}

/// Creates transport resources.
pub trait TransportFactory: Send + Sync {
    /// Create a new resource whose signals are reported through `signals`.
    fn create(&self, signals: SignalSender) -> Result<Box<dyn MediaTransport>>;
}
