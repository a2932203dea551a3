//! # Stall Debounce Timer
//!
//! Single-slot deferred confirmation of a suspected stall. Low-level
//! waiting/suspend signals fire spuriously during normal buffering; a stall is
//! only reported once progress has been absent for [`STALL_DELAY`].
//!
//! The timer holds a deadline rather than a task. The driver sleeps until
//! [`StallDebouncer::deadline`] and then calls [`StallDebouncer::fire_due`],
//! so cancelling is just clearing the slot.

use std::time::Duration;
use tokio::time::Instant;

/// Time without progress before a stall is confirmed.
pub const STALL_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pending {
    deadline: Instant,
    detail: Option<String>,
}

/// One Stall Incident slot.
#[derive(Debug, Default)]
pub struct StallDebouncer {
    pending: Option<Pending>,
    active: bool,
}

impl StallDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the confirmation delay. No-op while a timer is pending or an
    /// incident is already confirmed. Returns `true` if a timer was started.
    pub fn arm(&mut self, detail: Option<String>, now: Instant) -> bool {
        if self.pending.is_some() || self.active {
            return false;
        }
        self.pending = Some(Pending {
            deadline: now + STALL_DELAY,
            detail,
        });
        true
    }

    /// Clear the pending timer and the active incident. Idempotent.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.active = false;
    }

    /// When the pending timer is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a stall has been confirmed and not yet cleared by progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Confirm the incident if the timer is due at `now`.
    ///
    /// Returns `Some(detail)` exactly once per incident.
    pub fn fire_due(&mut self, now: Instant) -> Option<Option<String>> {
        match &self.pending {
            Some(p) if p.deadline <= now => {
                let fired = self.pending.take().map(|p| p.detail);
                self.active = true;
                fired
            }
            _ => None,
        }
    }
}
