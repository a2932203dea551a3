//! # Stream Player Demo
//!
//! Drives the player against a simulated relay: the first source fails, the
//! second one starts, hiccups briefly, stalls for real, recovers, and then the
//! broadcast drops so the player reconnects.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::logger::LogLevel;
use bridge_traits::{
    CodecSupport, HostProfile, MediaCapabilities, MediaTransport, SignalSender, StreamSource,
    TransportFactory, TransportSignal,
};
use core_playback::{PlayerConfig, PlayerService, StreamPlayer};
use core_runtime::config::CoreConfig;
use core_runtime::events::{listener, EventKind};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

// ============================================================================
// Simulated host
// ============================================================================

struct SimulatedCapabilities;

impl MediaCapabilities for SimulatedCapabilities {
    fn can_play_type(&self, mimetype: &str) -> CodecSupport {
        if mimetype.starts_with("audio/ogg") || mimetype == "audio/mpeg" {
            CodecSupport::Probably
        } else {
            CodecSupport::No
        }
    }
}

/// Creates relays; only the first one created runs the failure script.
struct SimulatedRelays {
    created: AtomicUsize,
}

impl TransportFactory for SimulatedRelays {
    fn create(&self, signals: SignalSender) -> BridgeResult<Box<dyn MediaTransport>> {
        let generation = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedRelay {
            generation,
            signals,
            sources: Vec::new(),
            script: None,
        }))
    }
}

struct SimulatedRelay {
    generation: usize,
    signals: SignalSender,
    sources: Vec<StreamSource>,
    script: Option<JoinHandle<()>>,
}

impl MediaTransport for SimulatedRelay {
    fn attach_source(&mut self, source: &StreamSource) -> BridgeResult<()> {
        self.sources.push(source.clone());
        Ok(())
    }

    fn set_volume(&mut self, gain: f32) -> BridgeResult<()> {
        println!("    relay gain -> {:.2}", gain);
        Ok(())
    }

    fn start(&mut self) -> BridgeResult<()> {
        let signals = self.signals.clone();
        let first_run = self.generation == 0;

        self.script = Some(tokio::spawn(async move {
            if first_run {
                sleep(Duration::from_millis(300)).await;
                signals.emit(TransportSignal::SourceError { index: 0 });
            }
            sleep(Duration::from_millis(400)).await;
            signals.emit(TransportSignal::Playing);
            sleep(Duration::from_millis(500)).await;
            signals.emit(TransportSignal::TimeUpdate);

            if !first_run {
                return;
            }

            // Brief hiccup, absorbed by the debounce.
            signals.emit(TransportSignal::Waiting);
            sleep(Duration::from_millis(70)).await;
            signals.emit(TransportSignal::TimeUpdate);

            // A real outage.
            signals.emit(TransportSignal::Suspended);
            sleep(Duration::from_millis(2500)).await;
            signals.emit(TransportSignal::TimeUpdate);

            sleep(Duration::from_millis(500)).await;
            signals.emit(TransportSignal::Ended);
        }));
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn detach_sources(&mut self) -> BridgeResult<()> {
        self.sources.clear();
        Ok(())
    }

    fn release(&mut self) -> BridgeResult<()> {
        if let Some(script) = self.script.take() {
            script.abort();
        }
        Ok(())
    }

    fn current_source(&self) -> Option<String> {
        self.sources.first().map(|s| s.uri.clone())
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    println!("=== Stream Player Demo ===\n");

    let core = CoreConfig::builder()
        .transport_factory(Arc::new(SimulatedRelays {
            created: AtomicUsize::new(0),
        }))
        .media_capabilities(Arc::new(SimulatedCapabilities))
        .host(HostProfile::new("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"))
        .build()?;

    let config = PlayerConfig {
        stream_query: "?1:demo-key".to_string(),
        ..PlayerConfig::default()
    };
    let (player, signals) = StreamPlayer::new(&core, config)?;
    println!("Format: {} ({})\n", player.format_tag(), player.mimetype());

    let handle = PlayerService::spawn(player, signals);
    for kind in EventKind::ALL {
        handle.subscribe(
            kind,
            listener(|event| println!("  event: {}", serde_json::to_string(event).unwrap_or_default())),
        );
    }

    handle.use_stream_uris(vec![
        "https://relay-a.example/chiptune.ogg?1:demo-key".to_string(),
        "https://relay-b.example/chiptune.ogg?1:demo-key".to_string(),
    ])?;
    handle.set_volume(0.8)?;

    println!("Playing...");
    let status = handle.play().await?;
    println!("  play() -> {:?}", status);

    sleep(Duration::from_secs(8)).await;

    println!("\nMuting...");
    handle.toggle_mute()?;
    sleep(Duration::from_millis(100)).await;

    println!("\nStopping...");
    handle.stop()?;
    sleep(Duration::from_millis(100)).await;
    println!("  status: {:?}", handle.status());

    handle.shutdown().await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}
