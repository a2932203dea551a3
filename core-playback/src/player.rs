//! # Stream Player
//!
//! The Session Controller. [`StreamPlayer`] owns exactly one [`Session`] at a
//! time, classifies the transport's low-level signals, and republishes them
//! as [`PlayerEvent`]s on the [`EventBus`].
//!
//! ## State machine
//!
//! ```text
//!            play()                playing / timeupdate
//!   Idle ─────────────▶ Starting ───────────────────────▶ Playing
//!                          │  ▲                             │
//!     waiting / suspended  │  └──── playing / timeupdate ───┤
//!     non-final src error  ▼                                ▼
//!                       Stalling ◀───── waiting / suspended ┘
//!
//!   stop() / ended / aborted / final src error / fatal error
//!       ──▶ Stopped ──▶ fresh Idle session (same step)
//! ```
//!
//! `ended` is followed by an immediate reconnect. Replacing a session is a
//! single teardown-then-rearm step, never a recursive call, so at most one
//! transport resource is alive at any time.
//!
//! The player is synchronous. Signals arrive through the [`SignalReceiver`]
//! returned by [`StreamPlayer::new`] and are fed back in with
//! [`StreamPlayer::handle_signal`]; the stall debounce deadline is exposed via
//! [`StreamPlayer::stall_deadline`] and fired with
//! [`StreamPlayer::poll_stall_timer`]. [`PlayerService`](crate::PlayerService)
//! drives both on tokio.

use crate::capability::{detect, FormatSupport};
use crate::channels::{build_uris, maybe_shuffle, ChannelSelector, ChannelTable, SourceList};
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::session::{Session, SessionPhase};
use crate::volume::VolumeState;
use bridge_traits::{
    signal_channel, BridgeError, SessionId, SignalEnvelope, SignalReceiver, SignalSender,
    SignalTx, StreamSource, TransportFactory, TransportSignal,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventKind, FailureReason, Listener, PlayerEvent};
use core_runtime::logging::redact_stream_url;
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of [`StreamPlayer::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayStatus {
    /// A new session was built and started.
    Started,
    /// A session is already starting, playing or stalling.
    AlreadyActive,
    /// The host cannot play any stream encoding.
    Unsupported,
    /// The source list is empty.
    NoSources,
    /// Building the session failed; an `error` event was published.
    Failed,
}

/// Snapshot of the player's readable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub is_supported: bool,
    pub is_playing: bool,
    pub phase: SessionPhase,
    pub volume: f32,
    pub is_muted: bool,
    pub mimetype: String,
    pub format_tag: String,
    pub reconnects: u64,
}

/// Session Controller for a continuous audio stream.
pub struct StreamPlayer {
    factory: Arc<dyn TransportFactory>,
    support: FormatSupport,
    channels: ChannelTable,
    stream_query: String,
    shuffle: bool,
    sources: SourceList,
    volume: VolumeState,
    session: Session,
    bus: EventBus,
    signals: SignalTx,
    unsupported_reported: bool,
    reconnects: u64,
}

impl StreamPlayer {
    /// Probe the host, load the default channel and return the player along
    /// with the queue its transports report signals on.
    pub fn new(core: &CoreConfig, config: PlayerConfig) -> Result<(Self, SignalReceiver)> {
        config.validate()?;
        let channels = config.channel_table()?;
        let support = detect(core.media_capabilities.as_ref(), &core.host, &config.probe);
        let (signals, receiver) = signal_channel();

        let mut player = Self {
            factory: Arc::clone(&core.transport_factory),
            support,
            channels,
            stream_query: config.stream_query,
            shuffle: config.shuffle_sources,
            sources: SourceList::default(),
            volume: VolumeState::new(config.initial_volume),
            session: Session::idle(),
            bus: EventBus::new(core.event_buffer_size),
            signals,
            unsupported_reported: false,
            reconnects: 0,
        };

        let default_channel = player.channels.default_channel().id;
        player.use_channel(default_channel, None);

        Ok((player, receiver))
    }

    // ------------------------------------------------------------------
    // Source selection
    // ------------------------------------------------------------------

    /// Select a channel. Unknown selectors fall back to the default channel.
    ///
    /// `query` replaces the stored stream query when given. Returns the id
    /// of the channel actually selected. A live session keeps its own copy
    /// of the previous list.
    pub fn use_channel(&mut self, selector: impl Into<ChannelSelector>, query: Option<&str>) -> u32 {
        if let Some(query) = query {
            self.stream_query = query.to_string();
        }

        let channel = self.channels.resolve_or_default(&selector.into());
        let uris = build_uris(channel, &self.support.format_tag, &self.stream_query);
        debug!(channel = channel.id, sources = uris.len(), "Channel selected");

        let id = channel.id;
        self.sources = SourceList::new(uris);
        id
    }

    /// Replace the source list with explicit URIs.
    pub fn use_stream_uris(&mut self, uris: impl Into<SourceList>) {
        self.sources = uris.into();
        debug!(sources = self.sources.len(), "Stream URIs set");
    }

    /// Enable or disable shuffling of sources on the next `play()`.
    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Build a session from the current source list and start it.
    ///
    /// Never fails outward: problems are published as `error` events and
    /// reflected in the returned [`PlayStatus`].
    #[instrument(skip(self), fields(session = tracing::field::Empty))]
    pub fn play(&mut self) -> PlayStatus {
        if !self.support.supported {
            if !self.unsupported_reported {
                self.unsupported_reported = true;
                error!("No playable stream encoding on this host");
                self.publish_failure(&PlaybackError::Unsupported, FailureReason::Unsupported);
            }
            return PlayStatus::Unsupported;
        }

        if self.session.phase().is_active() {
            debug!(phase = %self.session.phase(), "Play ignored, session already active");
            return PlayStatus::AlreadyActive;
        }

        if self.sources.is_empty() {
            warn!("Play requested without stream sources");
            self.publish_failure(&PlaybackError::NoSources, FailureReason::NoSources);
            return PlayStatus::NoSources;
        }

        match self.start_session() {
            Ok(()) => PlayStatus::Started,
            Err(err) => {
                self.fail(err);
                PlayStatus::Failed
            }
        }
    }

    fn start_session(&mut self) -> Result<()> {
        if self.support.long_load_host {
            self.bus.publish(PlayerEvent::LongLoadWarning);
        }

        let mut uris = self.sources.to_vec();
        maybe_shuffle(&mut uris, self.shuffle, &mut rand::rng());

        // Replacing an Idle session drops nothing live; a leftover transport
        // would be released by Session::drop.
        self.session = Session::idle();
        let session_id = self.session.id();
        tracing::Span::current().record("session", tracing::field::display(session_id));

        let transport = self
            .factory
            .create(SignalSender::new(session_id, self.signals.clone()))?;
        self.session.bind(transport, uris.clone());

        let mimetype = self.support.mimetype.clone();
        let gain = self.volume.gain();
        let transport = self.session.transport_mut().ok_or(BridgeError::Released)?;

        for (index, uri) in uris.iter().enumerate() {
            transport.attach_source(&StreamSource {
                index,
                uri: uri.clone(),
                mimetype: mimetype.clone(),
            })?;
            debug!(index, uri = %redact_stream_url(uri), "Source attached");
        }

        transport.set_volume(gain)?;
        transport.start()?;
        self.session.set_phase(SessionPhase::Starting);

        info!(sources = uris.len(), "Session started");
        self.bus.publish(PlayerEvent::Loading);
        self.bus.publish(PlayerEvent::Change);
        Ok(())
    }

    /// Tear down the live session and re-arm a fresh idle one.
    ///
    /// No-op when nothing is live or the host is unsupported.
    pub fn stop(&mut self) {
        if !self.support.supported || !self.session_is_live() {
            return;
        }
        info!(session = %self.session.id(), "Stopping playback");
        self.teardown_and_rearm();
    }

    /// Stop if playing, otherwise play.
    pub fn play_toggle(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    /// Release the transport without re-arming or publishing.
    pub fn shutdown(&mut self) {
        debug!(session = %self.session.id(), "Shutting down player");
        self.session.teardown();
    }

    fn session_is_live(&self) -> bool {
        self.session.has_transport() || self.session.phase().is_active()
    }

    /// `stop` and `change` are only published when the replaced session
    /// held a transport or was active.
    fn teardown_and_rearm(&mut self) {
        let was_live = self.session_is_live();
        let mut previous = std::mem::replace(&mut self.session, Session::idle());
        previous.teardown();
        drop(previous);

        if was_live {
            self.bus.publish(PlayerEvent::Stop);
            self.bus.publish(PlayerEvent::Change);
        }
    }

    fn fail(&mut self, err: PlaybackError) {
        error!(session = %self.session.id(), error = %err, "Playback failed");
        self.teardown_and_rearm();
        self.publish_failure(&err, err.failure_reason());
    }

    fn publish_failure(&self, err: &PlaybackError, reason: FailureReason) {
        self.bus.publish(PlayerEvent::Error {
            reason,
            message: err.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    /// Store a volume (0.0 to 1.0) and apply it unless muted.
    pub fn set_volume(&mut self, volume: f32) {
        if let Some(gain) = self.volume.set_volume(volume) {
            self.apply_gain(gain);
        }
        self.publish_volume();
    }

    /// Flip mute. Unmuting restores the stored volume.
    pub fn toggle_mute(&mut self) {
        let gain = self.volume.toggle_mute();
        self.apply_gain(gain);
        self.publish_volume();
    }

    fn apply_gain(&mut self, gain: f32) {
        if let Some(transport) = self.session.transport_mut() {
            if let Err(e) = transport.set_volume(gain) {
                warn!(error = %e, gain, "Failed to apply volume to transport");
            }
        }
    }

    fn publish_volume(&self) {
        self.bus.publish(PlayerEvent::VolumeChange {
            volume: self.volume.volume(),
            muted: self.volume.is_muted(),
        });
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn subscribe(&self, kind: EventKind, listener: Listener) {
        self.bus.subscribe(kind, listener);
    }

    /// Subscribe by event name. Unknown names are logged and ignored.
    pub fn subscribe_named(&self, name: &str, listener: Listener) {
        // Already logged by the bus.
        let _ = self.bus.subscribe_named(name, listener);
    }

    pub fn unsubscribe(&self, kind: EventKind, listener: &Listener) -> usize {
        self.bus.unsubscribe(kind, listener)
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    // ------------------------------------------------------------------
    // Transport signals and stall timer
    // ------------------------------------------------------------------

    /// Classify one low-level signal. Signals from a torn-down session are
    /// discarded.
    pub fn handle_signal(&mut self, envelope: SignalEnvelope) {
        let SignalEnvelope { session, signal } = envelope;

        if session != self.session.id() || !self.session.has_transport() {
            debug!(%session, signal = signal.name(), "Discarding signal from stale session");
            return;
        }

        debug!(
            %session,
            signal = signal.name(),
            phase = %self.session.phase(),
            source = ?self.session.current_source(),
            "Transport signal"
        );

        match signal {
            TransportSignal::Playing | TransportSignal::TimeUpdate => self.on_progress(),
            TransportSignal::Waiting => self.on_waiting(None),
            TransportSignal::Stalled | TransportSignal::Suspended => {
                if self.support.long_load_host {
                    debug!(signal = signal.name(), "Ignoring element stall on long-load host");
                } else {
                    self.on_waiting(None);
                }
            }
            TransportSignal::SourceError { index } => self.on_source_error(index),
            TransportSignal::Ended => {
                info!(%session, "Stream ended unexpectedly, reconnecting");
                self.teardown_and_rearm();
                self.reconnects += 1;
                self.play();
            }
            TransportSignal::Aborted => {
                info!(%session, "Stream aborted");
                self.teardown_and_rearm();
            }
            TransportSignal::Error { message } => {
                self.fail(PlaybackError::Transport(BridgeError::OperationFailed(message)));
            }
        }
    }

    fn on_progress(&mut self) {
        self.session.stall.cancel();
        if self.session.phase() != SessionPhase::Playing {
            self.session.set_phase(SessionPhase::Playing);
            self.bus.publish(PlayerEvent::Playing);
        }
    }

    fn on_waiting(&mut self, detail: Option<String>) {
        if detail.is_none() {
            self.bus.publish(PlayerEvent::Loading);
        }
        if matches!(
            self.session.phase(),
            SessionPhase::Starting | SessionPhase::Playing
        ) {
            self.session.set_phase(SessionPhase::Stalling);
        }
        if self.session.stall.arm(detail, Instant::now()) {
            debug!(session = %self.session.id(), "Stall debounce armed");
        }
    }

    fn on_source_error(&mut self, index: usize) {
        let total = self.session.sources().len();

        // An out-of-range index counts as the final source.
        if index < total.saturating_sub(1) {
            let detail = format!("{}/{} sources failed", index + 1, total);
            warn!(session = %self.session.id(), index, total, "Stream source failed, failing over");
            self.on_waiting(Some(detail));
        } else {
            error!(session = %self.session.id(), total, "All stream sources failed");
            self.teardown_and_rearm();
            self.bus.publish(PlayerEvent::Error {
                reason: FailureReason::SourcesExhausted,
                message: format!("All {} stream sources failed", total),
            });
        }
    }

    /// When the pending stall confirmation is due, if any.
    pub fn stall_deadline(&self) -> Option<Instant> {
        self.session.stall.deadline()
    }

    /// Confirm a pending stall whose deadline has passed at `now`.
    pub fn poll_stall_timer(&mut self, now: Instant) {
        if let Some(detail) = self.session.stall.fire_due(now) {
            warn!(session = %self.session.id(), detail = ?detail, "Stream stalled");
            self.bus.publish(PlayerEvent::Stall { detail });
        }
    }

    // ------------------------------------------------------------------
    // Readable state
    // ------------------------------------------------------------------

    pub fn is_supported(&self) -> bool {
        self.support.supported
    }

    pub fn is_playing(&self) -> bool {
        self.session.phase().is_active()
    }

    pub fn volume(&self) -> f32 {
        self.volume.volume()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    pub fn mimetype(&self) -> &str {
        &self.support.mimetype
    }

    pub fn format_tag(&self) -> &str {
        &self.support.format_tag
    }

    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    /// The stored source list used by the next `play()`.
    pub fn sources(&self) -> &[String] {
        self.sources.as_slice()
    }

    /// Sources attached to the live session, in attach order.
    pub fn session_sources(&self) -> &[String] {
        self.session.sources()
    }

    /// Number of automatic reconnects after unexpected stream ends.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            is_supported: self.is_supported(),
            is_playing: self.is_playing(),
            phase: self.phase(),
            volume: self.volume(),
            is_muted: self.is_muted(),
            mimetype: self.support.mimetype.clone(),
            format_tag: self.support.format_tag.clone(),
            reconnects: self.reconnects,
        }
    }
}

impl std::fmt::Debug for StreamPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPlayer")
            .field("support", &self.support)
            .field("sources", &self.sources.len())
            .field("shuffle", &self.shuffle)
            .field("volume", &self.volume)
            .field("session", &self.session)
            .finish()
    }
}
