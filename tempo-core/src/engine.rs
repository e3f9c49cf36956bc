//! The polling engine.
//!
//! Each poll reads the clock once, derives elapsed/remaining from the state's
//! anchor, and makes a single decision: render, or handle expiry. Expiry
//! handling is latched so overlapping polls cannot fire it twice.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::alarm::ClockAlarm;
use crate::circuit::Advance;
use crate::clock::ClockSource;
use crate::error::{Result, TempoError};
use crate::listener::{DisplayKind, Listener, RenderTick, SegmentNotification};
use crate::snapshot::{capture_elapsed, restore_elapsed, ModeSnapshot};
use crate::state::{Mode, TimerState};

/// Period of the visible render poll.
pub const RENDER_INTERVAL: std::time::Duration = std::time::Duration::from_millis(200);
/// Period of the expiry check that runs for unseen countdowns.
pub const BACKGROUND_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ExpiryLatch {
    #[default]
    Armed,
    Handling,
}

impl ExpiryLatch {
    fn engage(&mut self) -> bool {
        match self {
            ExpiryLatch::Armed => {
                *self = ExpiryLatch::Handling;
                true
            }
            ExpiryLatch::Handling => false,
        }
    }

    fn release(&mut self) {
        *self = ExpiryLatch::Armed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    NextStep,
    LoopRestart,
    CircuitComplete,
    TimerComplete,
    /// Another expiry was already being handled.
    Suppressed,
}

pub struct TimingEngine<C, L> {
    clock: C,
    listener: L,
    latch: ExpiryLatch,
}

impl<C: ClockSource, L: Listener> TimingEngine<C, L> {
    pub fn new(clock: C, listener: L) -> Self {
        Self {
            clock,
            listener,
            latch: ExpiryLatch::Armed,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// One visible poll.
    pub fn tick(&mut self, state: &mut TimerState) {
        let now = self.now();
        if state.is_passthrough() {
            // the background poll owns expiry while the overlay is up
            self.listener.on_clock_tick(now);
            return;
        }
        if state.mode() == Mode::Timer && state.is_running() && state.is_expired(now) {
            self.handle_expiry(state, now);
        }
        self.render(state, now);
    }

    fn render(&mut self, state: &TimerState, now: DateTime<Utc>) {
        let tick = match state.mode() {
            Mode::Timer => RenderTick {
                display_kind: DisplayKind::Remaining,
                value: state.remaining(now),
                total: state.total_duration(),
                circuit_progress: state.progress(),
            },
            Mode::Stopwatch => RenderTick {
                display_kind: DisplayKind::Elapsed,
                value: state.elapsed(now),
                total: Duration::zero(),
                circuit_progress: None,
            },
        };
        self.listener.on_render_tick(tick);
    }

    /// Runs the expiry rules for the current segment of `state`.
    pub fn handle_expiry(&mut self, state: &mut TimerState, now: DateTime<Utc>) -> ExpiryOutcome {
        if !self.latch.engage() {
            debug!("expiry already being handled, skipping");
            return ExpiryOutcome::Suppressed;
        }
        let outcome = self.expire(state, now);
        self.latch.release();
        outcome
    }

    fn expire(&mut self, state: &mut TimerState, now: DateTime<Utc>) -> ExpiryOutcome {
        if state.circuit().is_none() {
            state.finish();
            info!("timer complete");
            self.listener.on_alarm();
            self.listener
                .on_segment_notification(SegmentNotification::TimerComplete);
            return ExpiryOutcome::TimerComplete;
        }

        // one alarm per step boundary, the final one included
        self.listener.on_alarm();
        let (advance, name) = match state.circuit_mut() {
            Some(circuit) => (circuit.advance(), circuit.name().to_string()),
            None => return ExpiryOutcome::Suppressed,
        };
        match advance {
            Advance::NextStep(step) => {
                state.begin_segment(now);
                debug!(circuit = %name, duration_ms = step.duration().num_milliseconds(), "step started");
                ExpiryOutcome::NextStep
            }
            Advance::LoopRestart(step) => {
                state.begin_segment(now);
                debug!(circuit = %name, duration_ms = step.duration().num_milliseconds(), "pass restarted");
                ExpiryOutcome::LoopRestart
            }
            Advance::Complete => {
                state.finish();
                info!(circuit = %name, "circuit complete");
                self.listener
                    .on_segment_notification(SegmentNotification::CircuitComplete { name });
                ExpiryOutcome::CircuitComplete
            }
        }
    }

    /// Background expiry check for a countdown that is running unseen.
    /// Returns `None` when nothing was due.
    pub fn watch(&mut self, snapshot: &mut ModeSnapshot, now: DateTime<Utc>) -> Option<ExpiryOutcome> {
        if snapshot.mode != Mode::Timer || !snapshot.running || !snapshot.is_expired_at(now) {
            return None;
        }
        let mut scratch = restore_elapsed(snapshot.clone(), now);
        let outcome = self.handle_expiry(&mut scratch, now);
        *snapshot = capture_elapsed(&scratch, now);
        debug!(?outcome, "background expiry handled");
        Some(outcome)
    }

    /// Rings a time-of-day alarm. Timing state is not involved.
    pub fn ring(&mut self, alarm: &ClockAlarm) {
        info!(time = %alarm.label(), repeat = ?alarm.repeat(), "clock alarm");
        self.listener.on_alarm();
        self.listener
            .on_segment_notification(SegmentNotification::ClockAlarm { time: alarm.label() });
    }

    pub fn start(&mut self, state: &mut TimerState) -> Result<()> {
        if state.mode() == Mode::Timer && state.program().is_none() {
            return Err(TempoError::InvalidTransition("no countdown configured"));
        }
        if state.is_running() {
            return Ok(());
        }
        let now = self.now();
        if state.is_expired(now) {
            debug!("segment already expired, rewinding before start");
            state.rewind();
        }
        state.resume(now);
        info!(mode = ?state.mode(), "started");
        Ok(())
    }

    pub fn pause(&mut self, state: &mut TimerState) {
        if state.is_running() {
            state.pause(self.now());
            info!(mode = ?state.mode(), "paused");
        }
    }

    pub fn reset(&mut self, state: &mut TimerState) {
        state.rewind();
        info!(mode = ?state.mode(), "reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{CircuitProgram, LoopPolicy, Step};
    use crate::clock::ManualClock;
    use crate::listener::{Event, RecordingListener};
    use crate::state::Program;

    fn engine() -> (TimingEngine<ManualClock, RecordingListener>, ManualClock, RecordingListener) {
        let clock = ManualClock::at_epoch();
        let listener = RecordingListener::new();
        (
            TimingEngine::new(clock.clone(), listener.clone()),
            clock,
            listener,
        )
    }

    fn flat(millis: i64) -> TimerState {
        TimerState::timer(Some(Program::Flat(Duration::milliseconds(millis))))
    }

    #[test]
    fn test_latch_blocks_reentry() {
        let mut latch = ExpiryLatch::default();
        assert!(latch.engage());
        assert!(!latch.engage());
        latch.release();
        assert!(latch.engage());
    }

    #[test]
    fn test_flat_countdown_expires_once() {
        let (mut engine, clock, listener) = engine();
        let mut state = flat(1000);
        engine.start(&mut state).unwrap();
        clock.advance_ms(1200);
        engine.tick(&mut state);
        engine.tick(&mut state);
        clock.advance_ms(1000);
        engine.tick(&mut state);

        assert_eq!(listener.alarms(), 1);
        assert_eq!(listener.notifications(), vec![SegmentNotification::TimerComplete]);
        assert!(!state.is_running());
        assert_eq!(listener.last_render().unwrap().value, Duration::zero());
    }

    #[test]
    fn test_stopwatch_never_expires() {
        let (mut engine, clock, listener) = engine();
        let mut state = TimerState::stopwatch();
        engine.start(&mut state).unwrap();
        clock.advance_ms(86_400_000);
        engine.tick(&mut state);
        let tick = listener.last_render().unwrap();
        assert_eq!(tick.display_kind, DisplayKind::Elapsed);
        assert_eq!(tick.value, Duration::days(1));
        assert_eq!(listener.alarms(), 0);
    }

    #[test]
    fn test_start_without_program_is_rejected() {
        let (mut engine, _, _) = engine();
        let mut state = TimerState::timer(None);
        assert_eq!(
            engine.start(&mut state),
            Err(TempoError::InvalidTransition("no countdown configured"))
        );
        assert!(!state.is_running());
    }

    #[test]
    fn test_circuit_step_restarts_from_detection() {
        let (mut engine, clock, listener) = engine();
        let circuit = CircuitProgram::new(
            vec![Step::from_millis(1000), Step::new(Duration::seconds(5), "rest")],
            LoopPolicy::None,
        )
        .unwrap();
        let mut state = TimerState::timer(Some(Program::Circuit(circuit)));
        engine.start(&mut state).unwrap();
        clock.advance_ms(1150);
        engine.tick(&mut state);

        assert!(state.is_running());
        assert_eq!(listener.alarms(), 1);
        let tick = listener.last_render().unwrap();
        assert_eq!(tick.value, Duration::seconds(5));
        let progress = tick.circuit_progress.unwrap();
        assert_eq!(progress.step_index, 1);
        assert_eq!(progress.note.as_deref(), Some("rest"));
    }

    #[test]
    fn test_passthrough_tick_only_reports_clock() {
        let (mut engine, clock, listener) = engine();
        let mut state = flat(1000);
        engine.start(&mut state).unwrap();
        state.set_passthrough(true);
        clock.advance_ms(5000);
        engine.tick(&mut state);
        assert_eq!(listener.events(), vec![Event::Clock(clock.now())]);
    }

    #[test]
    fn test_watch_advances_parked_circuit() {
        let (mut engine, clock, listener) = engine();
        let circuit = CircuitProgram::new(
            vec![Step::from_millis(1000), Step::from_millis(2000)],
            LoopPolicy::None,
        )
        .unwrap();
        let mut state = TimerState::timer(Some(Program::Circuit(circuit)));
        engine.start(&mut state).unwrap();
        let mut parked = capture_elapsed(&state, clock.now());

        clock.advance_ms(500);
        assert_eq!(engine.watch(&mut parked, clock.now()), None);
        clock.advance_ms(600);
        assert_eq!(engine.watch(&mut parked, clock.now()), Some(ExpiryOutcome::NextStep));
        assert_eq!(parked.remaining_at(clock.now()), Duration::seconds(2));
        clock.advance_ms(2000);
        assert_eq!(
            engine.watch(&mut parked, clock.now()),
            Some(ExpiryOutcome::CircuitComplete)
        );
        assert!(!parked.running);
        assert_eq!(engine.watch(&mut parked, clock.now()), None);
        assert_eq!(listener.alarms(), 2);
        assert!(listener.last_render().is_none());
    }

    #[test]
    fn test_start_after_completion_rewinds() {
        let (mut engine, clock, listener) = engine();
        let mut state = flat(1000);
        engine.start(&mut state).unwrap();
        clock.advance_ms(1000);
        engine.tick(&mut state);
        assert!(!state.is_running());

        engine.start(&mut state).unwrap();
        engine.tick(&mut state);
        assert!(state.is_running());
        assert_eq!(listener.alarms(), 1);
        assert_eq!(listener.last_render().unwrap().value, Duration::seconds(1));
    }
}
