//! # Player Service
//!
//! Runs a [`StreamPlayer`] on tokio as a single cooperative loop. Each turn
//! handles exactly one item: a caller command, a transport signal, or the
//! stall debounce deadline. Callers talk to the loop through a cloneable
//! [`PlayerHandle`]; every call returns immediately and outcomes are
//! delivered through the event bus.
//!
//! ```ignore
//! let (player, signals) = StreamPlayer::new(&core_config, PlayerConfig::default())?;
//! let handle = PlayerService::spawn(player, signals);
//!
//! handle.subscribe(EventKind::Stall, listener(|event| println!("{:?}", event)));
//! handle.use_channel("chiptune", None)?;
//! handle.play().await?;
//! ```

use crate::channels::{ChannelSelector, SourceList};
use crate::error::{PlaybackError, Result};
use crate::player::{PlayStatus, PlayerStatus, StreamPlayer};
use bridge_traits::SignalReceiver;
use core_runtime::events::{EventBus, EventKind, Listener, PlayerEvent, Receiver};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// Requests sent from a [`PlayerHandle`] to the service loop.
enum PlayerCommand {
    UseChannel {
        selector: ChannelSelector,
        query: Option<String>,
    },
    UseStreamUris(SourceList),
    SetShuffle(bool),
    Play(Option<oneshot::Sender<PlayStatus>>),
    Stop,
    PlayToggle,
    SetVolume(f32),
    ToggleMute,
    Shutdown(oneshot::Sender<()>),
}

/// Owns the player and drives it from commands, signals and the stall timer.
pub struct PlayerService {
    player: StreamPlayer,
    commands: mpsc::UnboundedReceiver<PlayerCommand>,
    signals: SignalReceiver,
    status: watch::Sender<PlayerStatus>,
}

impl PlayerService {
    /// Spawn the service loop on the current tokio runtime.
    pub fn spawn(player: StreamPlayer, signals: SignalReceiver) -> PlayerHandle {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(player.status());
        let bus = player.events().clone();

        let service = Self {
            player,
            commands,
            signals,
            status,
        };
        tokio::spawn(service.run());

        PlayerHandle {
            commands: command_tx,
            status: status_rx,
            bus,
        }
    }

    async fn run(mut self) {
        info!("Player service started");

        loop {
            let deadline = self.player.stall_deadline();
            let stall_timer = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown(ack)) => {
                        self.player.shutdown();
                        self.publish_status();
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.apply(command),
                    None => {
                        debug!("All player handles dropped");
                        self.player.shutdown();
                        break;
                    }
                },
                Some(envelope) = self.signals.recv() => self.player.handle_signal(envelope),
                _ = stall_timer => self.player.poll_stall_timer(Instant::now()),
            }

            self.publish_status();
        }

        info!("Player service stopped");
    }

    fn apply(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::UseChannel { selector, query } => {
                self.player.use_channel(selector, query.as_deref());
            }
            PlayerCommand::UseStreamUris(uris) => self.player.use_stream_uris(uris),
            PlayerCommand::SetShuffle(enabled) => self.player.set_shuffle(enabled),
            PlayerCommand::Play(reply) => {
                let status = self.player.play();
                if let Some(reply) = reply {
                    let _ = reply.send(status);
                }
            }
            PlayerCommand::Stop => self.player.stop(),
            PlayerCommand::PlayToggle => self.player.play_toggle(),
            PlayerCommand::SetVolume(volume) => self.player.set_volume(volume),
            PlayerCommand::ToggleMute => self.player.toggle_mute(),
            PlayerCommand::Shutdown(_) => {}
        }
    }

    fn publish_status(&self) {
        self.status.send_if_modified(|current| {
            let next = self.player.status();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Cloneable, non-blocking caller API for a running [`PlayerService`].
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
    status: watch::Receiver<PlayerStatus>,
    bus: EventBus,
}

impl PlayerHandle {
    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::ServiceClosed)
    }

    pub fn use_channel(
        &self,
        selector: impl Into<ChannelSelector>,
        query: Option<String>,
    ) -> Result<()> {
        self.send(PlayerCommand::UseChannel {
            selector: selector.into(),
            query,
        })
    }

    pub fn use_stream_uris(&self, uris: impl Into<SourceList>) -> Result<()> {
        self.send(PlayerCommand::UseStreamUris(uris.into()))
    }

    pub fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.send(PlayerCommand::SetShuffle(enabled))
    }

    /// Request playback and wait for the loop to process the request.
    ///
    /// Playback itself is reported through events.
    pub async fn play(&self) -> Result<PlayStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Play(Some(tx)))?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)
    }

    /// Request playback without waiting.
    pub fn play_detached(&self) -> Result<()> {
        self.send(PlayerCommand::Play(None))
    }

    pub fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }

    pub fn play_toggle(&self) -> Result<()> {
        self.send(PlayerCommand::PlayToggle)
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute)
    }

    pub fn subscribe(&self, kind: EventKind, listener: Listener) {
        self.bus.subscribe(kind, listener);
    }

    /// Subscribe by event name. Unknown names are logged and rejected.
    pub fn subscribe_named(&self, name: &str, listener: Listener) -> Result<()> {
        Ok(self.bus.subscribe_named(name, listener)?)
    }

    pub fn unsubscribe(&self, kind: EventKind, listener: &Listener) -> usize {
        self.bus.unsubscribe(kind, listener)
    }

    /// Async stream of every published event.
    pub fn events(&self) -> Receiver<PlayerEvent> {
        self.bus.stream()
    }

    /// Latest readable state.
    pub fn status(&self) -> PlayerStatus {
        self.status.borrow().clone()
    }

    /// Watch channel that changes whenever the readable state does.
    pub fn status_updates(&self) -> watch::Receiver<PlayerStatus> {
        self.status.clone()
    }

    /// Release the transport and stop the service loop.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Shutdown(tx))?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)
    }
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("status", &*self.status.borrow())
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
