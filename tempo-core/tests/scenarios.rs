use chrono::Duration;
use tempo_core::{
    Controller, DisplayKind, DisplayMode, LoopPolicy, ManualClock, RecordingListener,
    SegmentNotification, Step, TempoError,
};

type Rig = Controller<ManualClock, RecordingListener>;

fn rig(preset_ms: i64) -> (Rig, ManualClock, RecordingListener) {
    let clock = ManualClock::at_epoch();
    let listener = RecordingListener::new();
    let controller = Controller::new(
        clock.clone(),
        listener.clone(),
        Some(Duration::milliseconds(preset_ms)),
    );
    (controller, clock, listener)
}

/// Polls at the render period until `until_ms` on the clock.
fn run_until(controller: &mut Rig, clock: &ManualClock, until_ms: i64) {
    while clock.elapsed_ms() < until_ms {
        clock.advance_ms(200.min(until_ms - clock.elapsed_ms()));
        controller.tick();
    }
}

#[test]
fn test_remaining_never_increases_while_running() {
    let (mut controller, clock, listener) = rig(10_000);
    controller.start().unwrap();
    let mut last = Duration::milliseconds(10_000);
    for jitter in [200, 350, 90, 1, 700, 200, 1200, 40] {
        clock.advance_ms(jitter);
        controller.tick();
        let tick = listener.last_render().unwrap();
        assert_eq!(tick.display_kind, DisplayKind::Remaining);
        assert!(tick.value <= last);
        last = tick.value;
    }
}

#[test]
fn test_pause_excludes_paused_time() {
    let (mut a, clock_a, _) = rig(30_000);
    let (mut b, clock_b, _) = rig(30_000);
    a.start().unwrap();
    b.start().unwrap();

    clock_a.advance_ms(7_000);
    clock_b.advance_ms(7_000);
    a.pause().unwrap();
    clock_a.advance_ms(12_345);
    a.start().unwrap();

    clock_a.advance_ms(3_000);
    clock_b.advance_ms(3_000);
    assert_eq!(a.status().value, b.status().value);
    assert_eq!(a.status().value, Duration::seconds(20));
}

#[test]
fn test_paused_countdown_expires_after_resume() {
    let (mut controller, clock, listener) = rig(10_000);
    controller.start().unwrap();
    run_until(&mut controller, &clock, 4_000);
    controller.pause().unwrap();
    assert_eq!(controller.status().value, Duration::seconds(6));

    run_until(&mut controller, &clock, 9_000);
    assert_eq!(controller.status().value, Duration::seconds(6));
    controller.start().unwrap();

    run_until(&mut controller, &clock, 14_800);
    assert_eq!(listener.alarms(), 0);
    run_until(&mut controller, &clock, 15_000);
    assert_eq!(listener.alarms(), 1);
    assert_eq!(listener.notifications(), vec![SegmentNotification::TimerComplete]);

    run_until(&mut controller, &clock, 20_000);
    assert_eq!(listener.alarms(), 1);
    assert_eq!(listener.last_render().unwrap().value, Duration::zero());
    assert!(!controller.state().is_running());
}

#[test]
fn test_counted_circuit_fires_once_per_step_then_completes() {
    let (mut controller, clock, listener) = rig(60_000);
    controller
        .configure_named_circuit(
            "Sprints",
            vec![Step::from_millis(2000), Step::from_millis(3000)],
            LoopPolicy::Count(2),
        )
        .unwrap();
    controller.start().unwrap();
    run_until(&mut controller, &clock, 30_000);

    assert_eq!(listener.alarms(), 4);
    assert_eq!(
        listener.notifications(),
        vec![SegmentNotification::CircuitComplete {
            name: "Sprints".to_string()
        }]
    );
    assert!(!controller.state().is_running());
}

#[test]
fn test_infinite_circuit_never_completes() {
    let (mut controller, clock, listener) = rig(60_000);
    controller
        .configure_circuit(
            vec![Step::from_millis(1000), Step::from_millis(1000)],
            LoopPolicy::Infinite,
        )
        .unwrap();
    controller.start().unwrap();

    let mut last_iteration = 1;
    for _ in 0..10 {
        let target = clock.elapsed_ms() + 2_200;
        run_until(&mut controller, &clock, target);
        let iteration = controller.state().circuit().unwrap().iteration();
        assert!(iteration > last_iteration);
        last_iteration = iteration;
    }
    assert!(listener.notifications().is_empty());
    assert!(controller.state().is_running());
}

#[test]
fn test_passthrough_round_trip_consumes_background_time() {
    let (mut controller, clock, listener) = rig(60_000);
    controller.start().unwrap();
    run_until(&mut controller, &clock, 5_000);
    let before = controller.status().value;

    controller.switch_mode(DisplayMode::Passthrough);
    listener.clear();
    for _ in 0..200 {
        clock.advance_ms(100);
        controller.background_tick();
        if clock.elapsed_ms() % 200 == 0 {
            controller.tick();
        }
    }
    assert!(listener.last_render().is_none());

    controller.switch_mode(DisplayMode::Timer);
    controller.tick();
    let after = listener.last_render().unwrap().value;
    let expected = before - Duration::seconds(20);
    assert!((after - expected).num_milliseconds().abs() <= 250);
    assert!(controller.state().is_running());
}

#[test]
fn test_circuit_advances_behind_the_clock_overlay() {
    let (mut controller, clock, listener) = rig(60_000);
    controller
        .configure_circuit(
            vec![Step::from_millis(2000), Step::from_millis(3000)],
            LoopPolicy::None,
        )
        .unwrap();
    controller.start().unwrap();
    controller.switch_mode(DisplayMode::Passthrough);
    while clock.elapsed_ms() < 10_000 {
        clock.advance_ms(100);
        controller.background_tick();
    }
    assert_eq!(listener.alarms(), 2);
    assert_eq!(listener.notifications().len(), 1);

    controller.switch_mode(DisplayMode::Timer);
    assert!(!controller.state().is_running());
    assert_eq!(listener.alarms(), 2);
}

#[test]
fn test_paused_timer_survives_stopwatch_detour_exactly() {
    let (mut controller, clock, _) = rig(60_000);
    controller.start().unwrap();
    clock.advance_ms(12_345);
    controller.pause().unwrap();
    let frozen = controller.status().value;

    controller.switch_mode(DisplayMode::Stopwatch);
    controller.start().unwrap();
    clock.advance_ms(98_765);
    controller.switch_mode(DisplayMode::Timer);

    assert_eq!(controller.status().value, frozen);
    assert!(!controller.state().is_running());
}

#[test]
fn test_empty_circuit_is_rejected_without_touching_program() {
    let (mut controller, _, _) = rig(60_000);
    controller
        .configure_circuit(vec![Step::from_millis(4000)], LoopPolicy::None)
        .unwrap();
    let before = controller.state().clone();

    let err = controller
        .configure_circuit(vec![], LoopPolicy::Count(2))
        .unwrap_err();
    assert!(matches!(err, TempoError::Configuration(_)));
    assert_eq!(controller.state(), &before);
}

#[test]
fn test_reset_rewinds_circuit_but_keeps_it() {
    let (mut controller, clock, _) = rig(60_000);
    controller
        .configure_circuit(
            vec![Step::from_millis(1000), Step::from_millis(5000)],
            LoopPolicy::Count(3),
        )
        .unwrap();
    controller.start().unwrap();
    run_until(&mut controller, &clock, 2_000);
    assert_eq!(controller.state().circuit().unwrap().current_index(), 1);

    controller.reset().unwrap();
    let circuit = controller.state().circuit().unwrap();
    assert_eq!(circuit.current_index(), 0);
    assert_eq!(circuit.remaining_iterations(), Some(3));
    assert!(!controller.state().is_running());
    assert_eq!(controller.status().value, Duration::seconds(1));
}
