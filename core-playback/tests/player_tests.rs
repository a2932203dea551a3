//! Session controller behavior driven through the recording transport.

mod support;

use bridge_traits::TransportSignal;
use core_playback::{PlayStatus, PlayerConfig, SessionPhase, StreamPlayer, STALL_DELAY};
use core_runtime::config::CoreConfig;
use core_runtime::events::{listener, EventKind, FailureReason, Listener, PlayerEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::*;
use tokio::time::{advance, Instant};

fn three_relays() -> Vec<String> {
    vec![
        "https://a.relay.example/all.ogg".to_string(),
        "https://b.relay.example/all.ogg".to_string(),
        "https://c.relay.example/all.ogg".to_string(),
    ]
}

async fn advance_and_poll(player: &mut StreamPlayer, by: Duration) {
    advance(by).await;
    player.poll_stall_timer(Instant::now());
}

// ============================================================================
// play / stop
// ============================================================================

#[test]
fn test_play_builds_session_and_publishes_loading_then_change() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    let events = record_events(&player);

    assert_eq!(player.play(), PlayStatus::Started);

    assert_eq!(kinds(&events), vec![EventKind::Loading, EventKind::Change]);
    assert_eq!(player.phase(), SessionPhase::Starting);
    assert!(player.is_playing());
    assert_eq!(factory.created(), 1);

    let calls = factory.calls(0);
    match &calls[0] {
        Call::Attach(source) => {
            assert_eq!(source.index, 0);
            assert_eq!(source.uri, "https://relay.nerdwave.cc/all.ogg");
            assert_eq!(source.mimetype, "audio/ogg");
        }
        other => panic!("expected attach first, got {:?}", other),
    }
    assert_eq!(calls[1], Call::SetVolume(1.0));
    assert_eq!(calls[2], Call::Start);
}

#[test]
fn test_play_attaches_sources_in_order() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.use_stream_uris(three_relays());

    player.play();

    assert_eq!(factory.attached_uris(0), three_relays());
    assert_eq!(player.session_sources(), three_relays().as_slice());
}

#[test]
fn test_play_while_active_is_a_no_op() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    assert_eq!(player.play(), PlayStatus::AlreadyActive);

    factory.emit(TransportSignal::Playing);
    drain(&mut player, &mut signals);
    assert_eq!(player.play(), PlayStatus::AlreadyActive);

    assert_eq!(factory.created(), 1);
    assert_eq!(kinds(&events), vec![EventKind::Playing]);
}

#[test]
fn test_stop_tears_down_and_rearms() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.play();
    let first_session = player.session_id();
    let events = record_events(&player);

    player.stop();

    assert_eq!(kinds(&events), vec![EventKind::Stop, EventKind::Change]);
    assert_eq!(player.phase(), SessionPhase::Idle);
    assert!(!player.is_playing());
    assert_ne!(player.session_id(), first_session);
    assert_eq!(factory.live(), 0);

    let calls = factory.calls(0);
    assert!(calls.ends_with(&[Call::Pause, Call::Detach, Call::Release]));
}

#[test]
fn test_stop_while_idle_publishes_nothing() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    let events = record_events(&player);

    player.stop();

    assert!(events.lock().is_empty());
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_stop_then_play_keeps_one_transport() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);

    player.play();
    player.stop();
    assert_eq!(player.play(), PlayStatus::Started);

    assert_eq!(factory.created(), 2);
    assert_eq!(factory.live(), 1);
    assert!(factory.is_released(0));
    assert!(!factory.is_released(1));
}

#[test]
fn test_play_toggle_alternates() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);

    player.play_toggle();
    assert!(player.is_playing());
    player.play_toggle();
    assert!(!player.is_playing());
    assert_eq!(factory.live(), 0);
}

#[test]
fn test_shutdown_releases_silently() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    player.shutdown();

    assert!(events.lock().is_empty());
    assert_eq!(factory.live(), 0);
    assert!(!player.is_playing());

    player.stop();
    assert!(events.lock().is_empty());
}

// ============================================================================
// Capability and sources
// ============================================================================

#[test]
fn test_unsupported_host_reports_once() {
    let factory = RecordingFactory::new();
    let core = core_config(&factory, FixedCapabilities::none(), DESKTOP_UA);
    let (mut player, _signals) = StreamPlayer::new(&core, PlayerConfig::default()).unwrap();
    let events = record_events(&player);

    assert!(!player.is_supported());
    assert_eq!(player.play(), PlayStatus::Unsupported);
    assert_eq!(player.play(), PlayStatus::Unsupported);
    player.stop();

    let seen = events.lock().clone();
    assert_eq!(seen.len(), 1);
    assert!(matches!(
        &seen[0],
        PlayerEvent::Error { reason: FailureReason::Unsupported, .. }
    ));
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_empty_source_list_is_rejected() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.use_stream_uris(Vec::<String>::new());
    let events = record_events(&player);

    assert_eq!(player.play(), PlayStatus::NoSources);

    assert!(matches!(
        events.lock().as_slice(),
        [PlayerEvent::Error { reason: FailureReason::NoSources, .. }]
    ));
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_chiptune_alias_matches_channel_four() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);

    assert_eq!(player.use_channel("chiptune", None), 4);
    let by_name = player.sources().to_vec();
    assert_eq!(player.use_channel(4u32, None), 4);
    let by_id = player.sources().to_vec();

    assert_eq!(by_name, by_id);
    assert_eq!(by_id, vec!["https://relay.nerdwave.cc/chiptune.ogg".to_string()]);
}

#[test]
fn test_unknown_channel_falls_back_to_default() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);

    assert_eq!(player.use_channel("polka", Some("?12:secret")), 5);
    assert_eq!(
        player.sources(),
        &["https://relay.nerdwave.cc/all.ogg?12:secret".to_string()]
    );
}

#[test]
fn test_mp3_host_uses_mp3_endpoints() {
    let factory = RecordingFactory::new();
    let core = core_config(&factory, FixedCapabilities(vec!["audio/mpeg"]), DESKTOP_UA);
    let (mut player, _signals) = StreamPlayer::new(&core, PlayerConfig::default()).unwrap();

    assert_eq!(player.mimetype(), "audio/mpeg");
    player.use_channel("game", None);
    assert_eq!(player.sources(), &["https://relay.nerdwave.cc/game.mp3".to_string()]);
}

#[test]
fn test_shuffle_applies_to_session_copy_only() {
    let factory = RecordingFactory::new();
    let config = PlayerConfig {
        shuffle_sources: true,
        ..PlayerConfig::default()
    };
    let (mut player, _signals) = desktop_player_with(&factory, config);
    let uris: Vec<String> = (0..12)
        .map(|i| format!("https://relay{}.example/all.ogg", i))
        .collect();
    player.use_stream_uris(uris.clone());

    player.play();

    assert_eq!(player.sources(), uris.as_slice());
    let mut attached = factory.attached_uris(0);
    attached.sort();
    let mut expected = uris.clone();
    expected.sort();
    assert_eq!(attached, expected);
}

// ============================================================================
// Signals
// ============================================================================

#[test]
fn test_playing_published_once_per_transition() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::Playing);
    factory.emit(TransportSignal::TimeUpdate);
    factory.emit(TransportSignal::TimeUpdate);
    drain(&mut player, &mut signals);

    assert_eq!(count(&events, EventKind::Playing), 1);
    assert_eq!(player.phase(), SessionPhase::Playing);

    factory.emit(TransportSignal::Waiting);
    factory.emit(TransportSignal::TimeUpdate);
    drain(&mut player, &mut signals);

    assert_eq!(count(&events, EventKind::Playing), 2);
    assert_eq!(count(&events, EventKind::Loading), 1);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_waiting_signals_yields_one_stall() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    factory.emit(TransportSignal::Playing);
    drain(&mut player, &mut signals);
    let events = record_events(&player);

    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    for signal in [
        TransportSignal::Suspended,
        TransportSignal::Waiting,
        TransportSignal::Stalled,
    ] {
        advance_and_poll(&mut player, Duration::from_millis(60)).await;
        factory.emit(signal);
        drain(&mut player, &mut signals);
    }
    assert_eq!(player.phase(), SessionPhase::Stalling);

    advance_and_poll(&mut player, Duration::from_millis(1820)).await;
    assert_eq!(count(&events, EventKind::Stall), 1);
    assert_eq!(
        events.lock().last(),
        Some(&PlayerEvent::Stall { detail: None })
    );

    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    advance_and_poll(&mut player, STALL_DELAY * 2).await;
    assert_eq!(count(&events, EventKind::Stall), 1);
    assert!(player.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_timeupdate_cancels_pending_stall() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    assert!(player.stall_deadline().is_some());

    advance_and_poll(&mut player, Duration::from_millis(1500)).await;
    factory.emit(TransportSignal::TimeUpdate);
    drain(&mut player, &mut signals);
    assert!(player.stall_deadline().is_none());

    advance_and_poll(&mut player, STALL_DELAY).await;
    assert_eq!(count(&events, EventKind::Stall), 0);
    assert_eq!(player.phase(), SessionPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_waiting_then_progress_within_window_scenario() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    assert_eq!(player.use_channel(5u32, None), 5);
    let events = record_events(&player);
    player.play();

    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    advance_and_poll(&mut player, Duration::from_millis(1800)).await;
    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    advance_and_poll(&mut player, Duration::from_millis(100)).await;
    factory.emit(TransportSignal::TimeUpdate);
    drain(&mut player, &mut signals);
    advance_and_poll(&mut player, Duration::from_secs(10)).await;

    assert_eq!(count(&events, EventKind::Stall), 0);
    assert_eq!(count(&events, EventKind::Playing), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failover_to_last_source_reaches_playing() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.use_stream_uris(three_relays());
    let events = record_events(&player);
    player.play();

    factory.emit(TransportSignal::SourceError { index: 0 });
    drain(&mut player, &mut signals);
    assert_eq!(player.phase(), SessionPhase::Stalling);

    advance_and_poll(&mut player, STALL_DELAY).await;
    assert_eq!(
        events.lock().last(),
        Some(&PlayerEvent::Stall {
            detail: Some("1/3 sources failed".to_string())
        })
    );

    factory.emit(TransportSignal::SourceError { index: 1 });
    factory.emit(TransportSignal::Playing);
    drain(&mut player, &mut signals);

    assert_eq!(player.phase(), SessionPhase::Playing);
    assert_eq!(count(&events, EventKind::Error), 0);
    assert_eq!(factory.live(), 1);
}

#[test]
fn test_all_sources_failing_publishes_one_error() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.use_stream_uris(three_relays());
    player.play();
    let events = record_events(&player);

    for index in 0..3 {
        factory.emit(TransportSignal::SourceError { index });
    }
    // Late signals from the released transport must be ignored.
    factory.emit(TransportSignal::SourceError { index: 2 });
    factory.emit(TransportSignal::Aborted);
    drain(&mut player, &mut signals);

    assert_eq!(count(&events, EventKind::Error), 1);
    assert!(events.lock().iter().any(|e| matches!(
        e,
        PlayerEvent::Error { reason: FailureReason::SourcesExhausted, .. }
    )));
    assert_eq!(count(&events, EventKind::Stop), 1);
    assert_eq!(player.phase(), SessionPhase::Idle);
    assert_eq!(factory.live(), 0);
}

#[test]
fn test_single_source_error_is_fatal() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::SourceError { index: 0 });
    drain(&mut player, &mut signals);

    assert_eq!(
        kinds(&events),
        vec![EventKind::Stop, EventKind::Change, EventKind::Error]
    );
}

#[test]
fn test_ended_reconnects_once_without_error() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    factory.emit(TransportSignal::Playing);
    drain(&mut player, &mut signals);
    let events = record_events(&player);

    factory.emit(TransportSignal::Ended);
    drain(&mut player, &mut signals);

    assert_eq!(
        kinds(&events),
        vec![
            EventKind::Stop,
            EventKind::Change,
            EventKind::Loading,
            EventKind::Change
        ]
    );
    assert_eq!(player.reconnects(), 1);
    assert_eq!(factory.created(), 2);
    assert_eq!(factory.live(), 1);
    assert!(factory.is_released(0));
    assert_eq!(player.phase(), SessionPhase::Starting);

    factory.sender(0).emit(TransportSignal::Ended);
    drain(&mut player, &mut signals);
    assert_eq!(player.reconnects(), 1);
    assert_eq!(count(&events, EventKind::Error), 0);
}

#[test]
fn test_abort_tears_down_without_reconnect() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::Aborted);
    drain(&mut player, &mut signals);

    assert_eq!(kinds(&events), vec![EventKind::Stop, EventKind::Change]);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.live(), 0);
}

#[test]
fn test_transport_error_is_fatal_without_reconnect() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::Error {
        message: "output device lost".to_string(),
    });
    drain(&mut player, &mut signals);

    let seen = events.lock().clone();
    match seen.last() {
        Some(PlayerEvent::Error { reason, message }) => {
            assert_eq!(*reason, FailureReason::Transport);
            assert!(message.contains("output device lost"));
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(factory.created(), 1);
    assert!(!player.is_playing());
}

#[test]
fn test_start_failure_releases_transport() {
    let factory = RecordingFactory::new();
    factory.fail_start(true);
    let (mut player, _signals) = desktop_player(&factory);
    let events = record_events(&player);

    assert_eq!(player.play(), PlayStatus::Failed);

    assert_eq!(
        kinds(&events),
        vec![EventKind::Stop, EventKind::Change, EventKind::Error]
    );
    assert_eq!(factory.live(), 0);
    assert_eq!(player.phase(), SessionPhase::Idle);

    factory.fail_start(false);
    assert_eq!(player.play(), PlayStatus::Started);
}

#[test]
fn test_create_failure_is_reported() {
    let factory = RecordingFactory::new();
    factory.fail_create(true);
    let (mut player, _signals) = desktop_player(&factory);
    let events = record_events(&player);

    assert_eq!(player.play(), PlayStatus::Failed);
    assert_eq!(kinds(&events), vec![EventKind::Error]);
    assert_eq!(factory.created(), 0);
}

#[test]
fn test_reconnect_create_failure_publishes_single_stop() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.play();
    let events = record_events(&player);

    factory.fail_create(true);
    factory.emit(TransportSignal::Ended);
    drain(&mut player, &mut signals);

    assert_eq!(
        kinds(&events),
        vec![EventKind::Stop, EventKind::Change, EventKind::Error]
    );
    assert_eq!(factory.live(), 0);
    assert!(!player.is_playing());
}

#[test]
fn test_out_of_range_source_index_is_fatal() {
    let factory = RecordingFactory::new();
    let (mut player, mut signals) = desktop_player(&factory);
    player.use_stream_uris(three_relays());
    player.play();
    let events = record_events(&player);

    factory.emit(TransportSignal::SourceError { index: usize::MAX });
    drain(&mut player, &mut signals);

    assert_eq!(count(&events, EventKind::Error), 1);
    assert!(matches!(
        events.lock().last(),
        Some(PlayerEvent::Error { reason: FailureReason::SourcesExhausted, .. })
    ));
    assert_eq!(count(&events, EventKind::Stall), 0);
    assert_eq!(factory.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_long_load_host_warns_and_ignores_element_stalls() {
    let factory = RecordingFactory::new();
    let core: CoreConfig = core_config(
        &factory,
        FixedCapabilities::mp3_and_vorbis(),
        CHROME_ANDROID_UA,
    );
    let (mut player, mut signals) = StreamPlayer::new(&core, PlayerConfig::default()).unwrap();
    let events = record_events(&player);

    player.play();
    assert_eq!(
        kinds(&events),
        vec![EventKind::LongLoadWarning, EventKind::Loading, EventKind::Change]
    );
    assert_eq!(player.format_tag(), "mp3");

    factory.emit(TransportSignal::Stalled);
    factory.emit(TransportSignal::Suspended);
    drain(&mut player, &mut signals);
    assert!(player.stall_deadline().is_none());
    assert_eq!(player.phase(), SessionPhase::Starting);

    factory.emit(TransportSignal::Waiting);
    drain(&mut player, &mut signals);
    advance_and_poll(&mut player, STALL_DELAY).await;
    assert_eq!(count(&events, EventKind::Stall), 1);
}

// ============================================================================
// Volume
// ============================================================================

#[test]
fn test_toggle_mute_twice_restores_volume() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.set_volume(0.4);
    player.play();
    let events = record_events(&player);

    player.toggle_mute();
    assert!(player.is_muted());
    player.toggle_mute();

    assert_eq!(player.volume(), 0.4);
    assert!(!player.is_muted());
    assert_eq!(factory.volumes(0), vec![0.4, 0.0, 0.4]);
    assert_eq!(
        events.lock().as_slice(),
        &[
            PlayerEvent::VolumeChange { volume: 0.4, muted: true },
            PlayerEvent::VolumeChange { volume: 0.4, muted: false },
        ]
    );
}

#[test]
fn test_set_volume_while_muted_is_applied_on_unmute() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    player.play();

    player.toggle_mute();
    player.set_volume(0.2);
    assert_eq!(factory.volumes(0), vec![1.0, 0.0]);
    assert_eq!(player.volume(), 0.2);

    player.toggle_mute();
    assert_eq!(factory.volumes(0), vec![1.0, 0.0, 0.2]);
}

#[test]
fn test_volume_survives_session_rebuild() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);

    player.set_volume(0.3);
    player.toggle_mute();
    player.play();
    player.stop();
    player.play();

    assert_eq!(factory.volumes(0), vec![0.0]);
    assert_eq!(factory.volumes(1), vec![0.0]);
    player.toggle_mute();
    assert_eq!(factory.volumes(1), vec![0.0, 0.3]);
}

#[test]
fn test_initial_volume_from_config() {
    let factory = RecordingFactory::new();
    let config = PlayerConfig {
        initial_volume: 0.7,
        ..PlayerConfig::default()
    };
    let (mut player, _signals) = desktop_player_with(&factory, config);

    player.play();
    assert_eq!(factory.volumes(0), vec![0.7]);
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_unsubscribe_from_inside_callback() {
    let factory = RecordingFactory::new();
    let (mut player, _signals) = desktop_player(&factory);
    let bus = player.events().clone();

    let once_calls = Arc::new(AtomicUsize::new(0));
    let other_calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Listener>>> = Arc::new(Mutex::new(None));

    let once = {
        let bus = bus.clone();
        let slot = Arc::clone(&slot);
        let calls = Arc::clone(&once_calls);
        listener(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = slot.lock().take() {
                bus.unsubscribe(EventKind::VolumeChange, &me);
            }
        })
    };
    *slot.lock() = Some(Arc::clone(&once));
    player.subscribe(EventKind::VolumeChange, once);

    let calls = Arc::clone(&other_calls);
    player.subscribe(
        EventKind::VolumeChange,
        listener(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        }),
    );

    player.set_volume(0.5);
    player.set_volume(0.6);

    assert_eq!(once_calls.load(Ordering::SeqCst), 1);
    assert_eq!(other_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_subscribe_named_ignores_unknown_kinds() {
    let factory = RecordingFactory::new();
    let (player, _signals) = desktop_player(&factory);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let l = listener(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    player.subscribe_named("volumeChange", Arc::clone(&l));
    player.subscribe_named("songChange", Arc::clone(&l));

    assert_eq!(player.events().listener_count(EventKind::VolumeChange), 1);
    assert_eq!(player.unsubscribe(EventKind::VolumeChange, &l), 1);
}
