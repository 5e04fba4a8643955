use proptest::prelude::*;
use shellplay_core::clock::VirtualClock;
use shellplay_core::events::PlaybackEvent;
use shellplay_core::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn waits(n: usize) -> WorkflowDocument {
    (0..n).fold(
        WorkflowDocument::new("waits").with_screen(Screen::new("s", "S")),
        |doc, i| doc.with_action(Action::new(format!("w{i}"), ActionType::Wait, "s").with_duration(5)),
    )
}

fn engine(doc: WorkflowDocument, clock: Arc<VirtualClock>) -> WorkflowEngine {
    let surface = shellplay_core::share(HeadlessSurface::new(&doc));
    WorkflowEngine::new(
        Arc::new(doc),
        surface,
        EngineConfig::default().humanize(false).seed(1),
    )
    .with_clock(clock)
}

fn wait_for(events: &Subscription, pred: impl Fn(&PlaybackEvent) -> bool) -> bool {
    while let Some(event) = events.recv_timeout(Duration::from_secs(5)) {
        if pred(&event) {
            return true;
        }
    }
    false
}

#[test]
fn player_runs_to_completion() {
    let mut engine = engine(waits(5), VirtualClock::new());
    let events = engine.subscribe();
    let player = Player::spawn(engine).unwrap();

    player.start();
    assert!(wait_for(&events, |e| matches!(e, PlaybackEvent::Completed { total: 5 })));
    let status = player.status();
    assert_eq!(status.state, PlaybackState::Completed);
    assert_eq!(status.progress, 1.0);

    let engine = player.shutdown().unwrap();
    assert_eq!(engine.stats().executed, 5);
}

#[test]
fn commands_navigate_and_report_unknown_screens() {
    let doc = waits(1).with_screen(Screen::new("t", "T"));
    let mut engine = engine(doc, VirtualClock::new());
    let events = engine.subscribe();
    let player = Player::spawn(engine).unwrap();
    let commands = player.commands();

    assert_eq!(commands.navigate("t").unwrap(), "t");
    assert_eq!(commands.status().current_screen_id.as_deref(), Some("t"));
    assert_eq!(commands.navigate("zz").unwrap_err().code, ErrorCode::ScreenNotFound);
    assert_eq!(commands.show_start_screen().unwrap(), "s");
    assert!(wait_for(&events, |e| matches!(
        e,
        PlaybackEvent::ScreenChanged { screen } if screen.id == "s"
    )));
}

#[test]
fn stop_from_handle_halts_looping_playback() {
    let clock = VirtualClock::new();
    let doc = waits(3);
    let surface = shellplay_core::share(HeadlessSurface::new(&doc));
    let mut engine = WorkflowEngine::new(
        Arc::new(doc),
        surface,
        EngineConfig::default().humanize(false).looping(true),
    )
    .with_clock(clock);
    let events = engine.subscribe();
    let player = Player::spawn(engine).unwrap();

    player.start();
    assert!(wait_for(&events, |e| matches!(e, PlaybackEvent::Looped { .. })));
    player.stop();
    assert!(wait_for(&events, |e| matches!(e, PlaybackEvent::Stopped { .. })));
    assert_eq!(player.status().state, PlaybackState::Stopped);
}

#[test]
fn commands_after_shutdown_report_player_gone() {
    let player = Player::spawn(engine(waits(1), VirtualClock::new())).unwrap();
    let commands = player.commands();
    assert!(player.shutdown().is_some());

    let err = commands.start().unwrap_err();
    assert_eq!(err.code, ErrorCode::PlayerGone);
    assert_eq!(err.to_string(), "[PlayerGone] Player thread has shut down");
    assert_eq!(commands.navigate("s").unwrap_err().code, ErrorCode::PlayerGone);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn progress_tracks_cursor(n in 0usize..12) {
        let mut engine = engine(waits(n), VirtualClock::new());
        engine.start();
        let mut last = 0;
        while engine.state() == PlaybackState::Running {
            let status = engine.status();
            let expected = if n == 0 { 0.0 } else { status.current_action_index as f64 / n as f64 };
            prop_assert_eq!(status.progress, expected);
            prop_assert!(status.current_action_index >= last);
            prop_assert!(status.progress < 1.0);
            last = status.current_action_index;
            engine.step();
        }
        prop_assert_eq!(engine.state(), PlaybackState::Completed);
        prop_assert_eq!(engine.status().progress, if n == 0 { 0.0 } else { 1.0 });
        prop_assert_eq!(engine.stats().executed, n);
    }
}
