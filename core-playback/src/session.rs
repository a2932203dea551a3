//! # Playback Session
//!
//! A [`Session`] is one playback attempt: the transport resource it owns,
//! the source list attached to it, and its Stall Incident slot. Releasing
//! the transport happens in [`Session::teardown`] and again, as a no-op if
//! already done, on drop, so every exit path frees the resource.

use crate::stall::StallDebouncer;
use bridge_traits::{MediaTransport, SessionId};
use core_runtime::logging::redact_stream_url;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// No transport attached.
    Idle,
    /// Transport attached, sources loading.
    Starting,
    /// Stream is advancing.
    Playing,
    /// Suspected stall, confirmation pending or confirmed.
    Stalling,
    /// Torn down. Replaced by a fresh `Idle` session right away.
    Stopped,
}

impl SessionPhase {
    /// Starting, Playing and Stalling all count as playing from the
    /// caller's point of view.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionPhase::Starting | SessionPhase::Playing | SessionPhase::Stalling
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::Playing => "playing",
            SessionPhase::Stalling => "stalling",
            SessionPhase::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// The single live unit of playback.
pub struct Session {
    id: SessionId,
    phase: SessionPhase,
    transport: Option<Box<dyn MediaTransport>>,
    sources: Vec<String>,
    pub(crate) stall: StallDebouncer,
}

impl Session {
    /// A fresh session with no transport.
    pub fn idle() -> Self {
        Self {
            id: SessionId::new(),
            phase: SessionPhase::Idle,
            transport: None,
            sources: Vec::new(),
            stall: StallDebouncer::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            debug!(session = %self.id, from = %self.phase, to = %phase, "Session phase change");
            self.phase = phase;
        }
    }

    /// Sources attached to this session, in attach order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub(crate) fn bind(&mut self, transport: Box<dyn MediaTransport>, sources: Vec<String>) {
        self.transport = Some(transport);
        self.sources = sources;
    }

    pub(crate) fn transport_mut(&mut self) -> Option<&mut (dyn MediaTransport + 'static)> {
        self.transport.as_deref_mut()
    }

    /// Source the transport is currently reading, for diagnostics.
    pub fn current_source(&self) -> Option<String> {
        self.transport
            .as_ref()
            .and_then(|t| t.current_source())
            .map(|uri| redact_stream_url(&uri))
    }

    /// Detach every source, halt and release the transport.
    ///
    /// Bridge failures are logged; teardown always completes.
    pub fn teardown(&mut self) {
        self.stall.cancel();
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.pause() {
                warn!(session = %self.id, error = %e, "Transport pause failed during teardown");
            }
            if let Err(e) = transport.detach_sources() {
                warn!(session = %self.id, error = %e, "Detaching sources failed during teardown");
            }
            if let Err(e) = transport.release() {
                warn!(session = %self.id, error = %e, "Transport release failed");
            }
            debug!(session = %self.id, "Transport released");
        }
        self.phase = SessionPhase::Stopped;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.transport.is_some() {
            self.teardown();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("transport", &self.transport.as_ref().map(|_| "MediaTransport { ... }"))
            .field("sources", &self.sources.len())
            .field("stall", &self.stall)
            .finish()
    }
}
