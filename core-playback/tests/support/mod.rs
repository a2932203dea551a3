//! Shared test doubles: a recording transport factory, a fixed capability
//! bridge, and an event recorder.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, CodecSupport, HostProfile, MediaCapabilities, MediaTransport, SignalReceiver,
    SignalSender, StreamSource, TransportFactory, TransportSignal,
};
use core_playback::{PlayerConfig, StreamPlayer};
use core_runtime::config::CoreConfig;
use core_runtime::events::{listener, EventKind, PlayerEvent};
use parking_lot::Mutex;
use std::sync::Arc;

pub const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
pub const CHROME_ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36";

/// One call made on a transport, tagged with the transport's creation index.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach(StreamSource),
    SetVolume(f32),
    Start,
    Pause,
    Detach,
    Release,
}

#[derive(Default)]
struct FactoryState {
    senders: Vec<SignalSender>,
    calls: Vec<(usize, Call)>,
    released: Vec<usize>,
    fail_create: bool,
    fail_start: bool,
}

/// Transport factory whose transports record every call.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().fail_start = fail;
    }

    /// Number of transports created so far.
    pub fn created(&self) -> usize {
        self.state.lock().senders.len()
    }

    /// Number of transports created and not yet released.
    pub fn live(&self) -> usize {
        let state = self.state.lock();
        state.senders.len() - state.released.len()
    }

    pub fn is_released(&self, transport: usize) -> bool {
        self.state.lock().released.contains(&transport)
    }

    /// Signal sender handed to transport number `transport`.
    pub fn sender(&self, transport: usize) -> SignalSender {
        self.state.lock().senders[transport].clone()
    }

    /// Emit a signal from the most recently created transport.
    pub fn emit(&self, signal: TransportSignal) {
        let sender = {
            let state = self.state.lock();
            state.senders.last().cloned().expect("no transport created")
        };
        sender.emit(signal);
    }

    pub fn calls(&self, transport: usize) -> Vec<Call> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(t, _)| *t == transport)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn attached_uris(&self, transport: usize) -> Vec<String> {
        self.calls(transport)
            .into_iter()
            .filter_map(|call| match call {
                Call::Attach(source) => Some(source.uri),
                _ => None,
            })
            .collect()
    }

    pub fn volumes(&self, transport: usize) -> Vec<f32> {
        self.calls(transport)
            .into_iter()
            .filter_map(|call| match call {
                Call::SetVolume(gain) => Some(gain),
                _ => None,
            })
            .collect()
    }
}

impl TransportFactory for RecordingFactory {
    fn create(&self, signals: SignalSender) -> BridgeResult<Box<dyn MediaTransport>> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(BridgeError::NotAvailable("audio output".to_string()));
        }
        let index = state.senders.len();
        state.senders.push(signals);
        Ok(Box::new(RecordingTransport {
            index,
            state: Arc::clone(&self.state),
            current: None,
        }))
    }
}

struct RecordingTransport {
    index: usize,
    state: Arc<Mutex<FactoryState>>,
    current: Option<String>,
}

impl RecordingTransport {
    fn record(&self, call: Call) {
        self.state.lock().calls.push((self.index, call));
    }
}

impl MediaTransport for RecordingTransport {
    fn attach_source(&mut self, source: &StreamSource) -> BridgeResult<()> {
        if self.current.is_none() {
            self.current = Some(source.uri.clone());
        }
        self.record(Call::Attach(source.clone()));
        Ok(())
    }

    fn set_volume(&mut self, gain: f32) -> BridgeResult<()> {
        self.record(Call::SetVolume(gain));
        Ok(())
    }

    fn start(&mut self) -> BridgeResult<()> {
        if self.state.lock().fail_start {
            return Err(BridgeError::OperationFailed("autoplay blocked".to_string()));
        }
        self.record(Call::Start);
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.record(Call::Pause);
        Ok(())
    }

    fn detach_sources(&mut self) -> BridgeResult<()> {
        self.current = None;
        self.record(Call::Detach);
        Ok(())
    }

    fn release(&mut self) -> BridgeResult<()> {
        self.record(Call::Release);
        self.state.lock().released.push(self.index);
        Ok(())
    }

    fn current_source(&self) -> Option<String> {
        self.current.clone()
    }
}

/// Capability bridge that plays exactly the listed MIME types.
pub struct FixedCapabilities(pub Vec<&'static str>);

impl FixedCapabilities {
    pub fn mp3_and_vorbis() -> Self {
        Self(vec!["audio/mpeg", "audio/ogg; codecs=\"vorbis\""])
    }

    pub fn none() -> Self {
        Self(Vec::new())
    }
}

impl MediaCapabilities for FixedCapabilities {
    fn can_play_type(&self, mimetype: &str) -> CodecSupport {
        if self.0.contains(&mimetype) {
            CodecSupport::Probably
        } else {
            CodecSupport::No
        }
    }
}

pub fn core_config(
    factory: &RecordingFactory,
    capabilities: FixedCapabilities,
    user_agent: &str,
) -> CoreConfig {
    CoreConfig::builder()
        .transport_factory(Arc::new(factory.clone()))
        .media_capabilities(Arc::new(capabilities))
        .host(HostProfile::new(user_agent))
        .build()
        .expect("valid core config")
}

/// A player on a desktop host that plays both encodings.
pub fn desktop_player(factory: &RecordingFactory) -> (StreamPlayer, SignalReceiver) {
    desktop_player_with(factory, PlayerConfig::default())
}

pub fn desktop_player_with(
    factory: &RecordingFactory,
    config: PlayerConfig,
) -> (StreamPlayer, SignalReceiver) {
    let core = core_config(factory, FixedCapabilities::mp3_and_vorbis(), DESKTOP_UA);
    StreamPlayer::new(&core, config).expect("valid player config")
}

/// Feed every queued signal to the player.
pub fn drain(player: &mut StreamPlayer, signals: &mut SignalReceiver) {
    while let Ok(envelope) = signals.try_recv() {
        player.handle_signal(envelope);
    }
}

/// Subscribe to every event kind and collect what is published, in order.
pub fn record_events(player: &StreamPlayer) -> Arc<Mutex<Vec<PlayerEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let recorder = listener(move |event: &PlayerEvent| sink.lock().push(event.clone()));
    for kind in EventKind::ALL {
        player.subscribe(kind, Arc::clone(&recorder));
    }
    seen
}

pub fn kinds(events: &Mutex<Vec<PlayerEvent>>) -> Vec<EventKind> {
    events.lock().iter().map(PlayerEvent::kind).collect()
}

pub fn count(events: &Mutex<Vec<PlayerEvent>>, kind: EventKind) -> usize {
    events.lock().iter().filter(|e| e.kind() == kind).count()
}
