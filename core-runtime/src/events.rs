//! # Event Bus System
//!
//! Typed publish/subscribe registry through which the playback engine reports
//! its lifecycle to UI collaborators.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Kinds**: A fixed, enumerated set of [`EventKind`]s
//! - **Player Events**: [`PlayerEvent`], one variant per kind, payload-bearing where needed
//! - **EventBus**: Ordered listener lists per kind, delivered synchronously
//! - **Event Stream**: A `tokio::sync::broadcast` mirror for async consumers
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   publish   ┌────────────┐  listeners, in order  ┌──────────┐
//! │ StreamPlayer ├────────────>│  EventBus  ├──────────────────────>│ UI code  │
//! └──────────────┘             │            │                       └──────────┘
//!                              │            │  broadcast stream     ┌──────────┐
//!                              │            ├──────────────────────>│  async   │
//!                              └────────────┘                       └──────────┘
//! ```
//!
//! ## Delivery Rules
//!
//! - Listeners for a kind are called in subscription order.
//! - Delivery iterates over a snapshot of the listener list, so a listener may
//!   unsubscribe itself (or others) mid-delivery without skipping or
//!   double-firing anyone else in the same publish call.
//! - A panicking listener is logged and skipped; later listeners still run.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{listener, EventBus, EventKind, PlayerEvent};
//!
//! let bus = EventBus::default();
//! let on_stall = listener(|event| {
//!     if let PlayerEvent::Stall { detail } = event {
//!         println!("stalled {:?}", detail);
//!     }
//! });
//! bus.subscribe(EventKind::Stall, on_stall.clone());
//! bus.publish(PlayerEvent::Stall { detail: None });
//! bus.unsubscribe(EventKind::Stall, &on_stall);
//! ```

use crate::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

// Re-export commonly used types
pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the broadcast mirror.
///
/// Stream subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Kinds
// ============================================================================

/// The fixed set of event kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Playing,
    Stop,
    Change,
    VolumeChange,
    Loading,
    Stall,
    Error,
    LongLoadWarning,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::Playing,
        EventKind::Stop,
        EventKind::Change,
        EventKind::VolumeChange,
        EventKind::Loading,
        EventKind::Stall,
        EventKind::Error,
        EventKind::LongLoadWarning,
    ];

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Playing => "playing",
            EventKind::Stop => "stop",
            EventKind::Change => "change",
            EventKind::VolumeChange => "volumeChange",
            EventKind::Loading => "loading",
            EventKind::Stall => "stall",
            EventKind::Error => "error",
            EventKind::LongLoadWarning => "longLoadWarning",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEventKind(s.to_string()))
    }
}

// ============================================================================
// Player Events
// ============================================================================

/// Why a playback attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// The host cannot play any supported encoding.
    Unsupported,
    /// `play()` was called with an empty source list.
    NoSources,
    /// Every attached source failed.
    SourcesExhausted,
    /// The transport resource itself failed (device, permission, start refused).
    Transport,
}

/// Events published by the playback engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Audio is flowing.
    Playing,
    /// The session was torn down.
    Stop,
    /// Playing/stopped status changed.
    Change,
    /// Volume or mute state changed.
    VolumeChange {
        /// Stored volume (0.0 - 1.0), independent of mute.
        volume: f32,
        /// Whether output is currently muted.
        muted: bool,
    },
    /// The engine is waiting for data.
    Loading,
    /// A stall outlasted the debounce window.
    Stall {
        /// Failover detail, e.g. `"1/3 sources failed"`.
        detail: Option<String>,
    },
    /// Playback failed and will not recover on its own.
    Error {
        reason: FailureReason,
        /// Human-readable error message.
        message: String,
    },
    /// The host is known to take a long time before audio starts.
    LongLoadWarning,
}

impl PlayerEvent {
    /// The kind listeners subscribe to for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::Playing => EventKind::Playing,
            PlayerEvent::Stop => EventKind::Stop,
            PlayerEvent::Change => EventKind::Change,
            PlayerEvent::VolumeChange { .. } => EventKind::VolumeChange,
            PlayerEvent::Loading => EventKind::Loading,
            PlayerEvent::Stall { .. } => EventKind::Stall,
            PlayerEvent::Error { .. } => EventKind::Error,
            PlayerEvent::LongLoadWarning => EventKind::LongLoadWarning,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// A subscribed callback. Identity (for unsubscribing) is the `Arc` pointer.
pub type Listener = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&PlayerEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Registry {
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
    sender: broadcast::Sender<PlayerEvent>,
}

/// Central event bus for publishing and subscribing to player events.
///
/// Cloning the bus is cheap; clones share the same listener table.
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    /// Creates a new event bus whose broadcast mirror buffers `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            registry: Arc::new(Registry {
                listeners: Mutex::new(HashMap::new()),
                sender,
            }),
        }
    }

    /// Register `listener` for `kind`. Registration order is delivery order.
    pub fn subscribe(&self, kind: EventKind, listener: Listener) {
        self.registry
            .listeners
            .lock()
            .entry(kind)
            .or_default()
            .push(listener);
    }

    /// Register by wire name. Unknown names are logged and ignored.
    pub fn subscribe_named(&self, name: &str, listener: Listener) -> Result<()> {
        match name.parse::<EventKind>() {
            Ok(kind) => {
                self.subscribe(kind, listener);
                Ok(())
            }
            Err(err) => {
                error!(event = name, "{} is not a supported player event", name);
                Err(err)
            }
        }
    }

    /// Remove every registration of `listener` for `kind`.
    ///
    /// Returns the number of registrations removed. Safe to call from inside a
    /// listener while an event of the same kind is being delivered.
    pub fn unsubscribe(&self, kind: EventKind, listener: &Listener) -> usize {
        let mut table = self.registry.listeners.lock();
        let Some(list) = table.get_mut(&kind) else {
            return 0;
        };
        let before = list.len();
        list.retain(|registered| !Arc::ptr_eq(registered, listener));
        before - list.len()
    }

    /// Remove by wire name. Unknown names remove nothing.
    pub fn unsubscribe_named(&self, name: &str, listener: &Listener) -> usize {
        match name.parse::<EventKind>() {
            Ok(kind) => self.unsubscribe(kind, listener),
            Err(_) => 0,
        }
    }

    /// Deliver `event` synchronously to every current listener of its kind.
    ///
    /// Returns the number of listeners that completed without panicking. The
    /// event is also forwarded to [`stream`](Self::stream) receivers.
    pub fn publish(&self, event: PlayerEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        debug!(event = %kind, listeners = snapshot.len(), "Publishing player event");

        let mut delivered = 0;
        for listener in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        event = %kind,
                        panic = %panic_message(payload.as_ref()),
                        "Player event listener panicked"
                    );
                }
            }
        }

        // No stream receivers is the common case.
        let _ = self.registry.sender.send(event);
        delivered
    }

    /// Creates an async receiver for every event published from now on.
    pub fn stream(&self) -> Receiver<PlayerEvent> {
        self.registry.sender.subscribe()
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .listeners
            .lock()
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.registry.listeners.lock();
        let total: usize = table.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("listener_count", &total)
            .field("stream_count", &self.registry.sender.receiver_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
