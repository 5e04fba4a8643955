use parking_lot::Mutex;
use proptest::prelude::*;
use shellplay_core::clock::VirtualClock;
use shellplay_core::control::PlaybackControl;
use shellplay_core::jitter::Jitter;
use shellplay_core::prelude::*;
use shellplay_core::surface::SurfaceEventKind;
use shellplay_core::workflow::{BoundingBox, ElementType};
use shellplay_core::Motion;
use std::sync::Arc;
use std::time::Duration;

fn notes_screen() -> (WorkflowDocument, Arc<Mutex<HeadlessSurface>>) {
    let doc = WorkflowDocument::new("notes").with_screen(Screen::new("n", "Notes").with_element(
        UIElement::new("body", ElementType::Textarea, BoundingBox::new(0.0, 0.0, 400.0, 300.0)),
    ));
    let mut surface = HeadlessSurface::new(&doc);
    surface.navigate(&doc.screens[0]);
    surface.focus("body");
    (doc, Arc::new(Mutex::new(surface)))
}

fn simulator(humanize: bool, seed: u64, clock: &Arc<VirtualClock>) -> BehaviorSimulator {
    BehaviorSimulator::new(BehaviorConfig {
        humanize,
        ..Default::default()
    })
    .with_jitter(Jitter::seeded(seed))
    .with_clock(clock.clone())
}

#[test]
fn stop_cancels_motion_between_samples() {
    let clock = VirtualClock::new();
    let control = Arc::new(PlaybackControl::new());
    let (_, surface) = notes_screen();
    let shared: SharedSurface = surface.clone();
    let mut sim = simulator(false, 1, &clock).with_control(control.clone());

    control.request_stop();
    assert_eq!(sim.move_mouse(&shared, Point::new(300.0, 200.0)), Motion::Cancelled);
    assert_eq!(sim.mouse_position(), Point::default());
    assert_eq!(sim.type_text(&shared, "abc", 10.0), Motion::Cancelled);
    assert_eq!(surface.lock().value("body"), Some(""));
}

#[test]
fn double_click_dispatches_combined_event() {
    let clock = VirtualClock::new();
    let (_, surface) = notes_screen();
    let shared: SharedSurface = surface.clone();
    let mut sim = simulator(false, 1, &clock);
    sim.double_click(&shared);

    let kinds: Vec<_> = surface
        .lock()
        .events()
        .iter()
        .filter_map(|e| match &e.kind {
            SurfaceEventKind::Pointer { pointer, .. } => Some(*pointer),
            _ => None,
        })
        .collect();
    use shellplay_core::surface::PointerKind::*;
    assert_eq!(kinds, vec![Down, Up, Click, Down, Up, Click, DoubleClick]);
    // dwell, gap, dwell
    assert_eq!(
        clock.sleeps(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(80),
            Duration::from_millis(100)
        ]
    );
}

#[test]
fn scroll_is_ten_steps_at_fixed_cadence() {
    let clock = VirtualClock::new();
    let (_, surface) = notes_screen();
    let shared: SharedSurface = surface.clone();
    let mut sim = simulator(true, 9, &clock);
    assert_eq!(sim.scroll(&shared, 0.0, 300.0), Motion::Completed);

    assert_eq!(surface.lock().scroll_offset(), (0.0, 300.0));
    assert_eq!(clock.sleeps(), vec![Duration::from_millis(16); 10]);
}

proptest! {
    #[test]
    fn pointer_always_snaps_to_target(
        seed in any::<u64>(),
        x in -5000.0f64..5000.0,
        y in -5000.0f64..5000.0,
        start_x in -500.0f64..500.0,
        start_y in -500.0f64..500.0,
    ) {
        let clock = VirtualClock::new();
        let (_, surface) = notes_screen();
        let shared: SharedSurface = surface;
        let mut sim = simulator(true, seed, &clock);
        sim.set_mouse_position(Point::new(start_x, start_y));

        prop_assert_eq!(sim.move_mouse(&shared, Point::new(x, y)), Motion::Completed);
        prop_assert_eq!(sim.mouse_position(), Point::new(x, y));
    }

    #[test]
    fn unhumanized_typing_has_constant_cadence(
        text in "[a-zA-Z .,!?]{1,40}",
        speed in 1u32..40,
    ) {
        let clock = VirtualClock::new();
        let (_, surface) = notes_screen();
        let shared: SharedSurface = surface.clone();
        let mut sim = simulator(false, 0, &clock);

        prop_assert_eq!(sim.type_text(&shared, &text, speed as f64), Motion::Completed);

        let inputs = surface
            .lock()
            .events()
            .iter()
            .filter(|e| matches!(e.kind, SurfaceEventKind::Input { .. }))
            .count();
        prop_assert_eq!(inputs, text.chars().count());
        let guard = surface.lock();
        prop_assert_eq!(guard.value("body"), Some(text.as_str()));
        drop(guard);

        let sleeps = clock.sleeps();
        prop_assert_eq!(sleeps.len(), text.chars().count());
        let first = sleeps[0];
        prop_assert!(sleeps.iter().all(|d| *d == first));
        let nominal = 1.0 / speed as f64;
        prop_assert!((first.as_secs_f64() - nominal).abs() < 1e-6);
    }
}
