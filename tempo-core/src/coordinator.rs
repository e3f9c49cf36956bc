//! Mode transitions between Timer, Stopwatch and the clock overlay.
//!
//! Each concrete mode has one snapshot slot. Switching away from a mode
//! parks it in its slot; switching back thaws the slot with the time spent
//! away already accounted for. The overlay never stops the run underneath:
//! it freezes the active mode into a [`BackgroundSession`] that the
//! background poll keeps checking for expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::ClockSource;
use crate::engine::TimingEngine;
use crate::listener::Listener;
use crate::snapshot::{capture_elapsed, restore_elapsed, BackgroundSession, ModeSnapshot};
use crate::state::{Mode, Program, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Timer,
    Stopwatch,
    /// Current time of day shown over whichever mode is underneath.
    Passthrough,
}

impl From<Mode> for DisplayMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Timer => DisplayMode::Timer,
            Mode::Stopwatch => DisplayMode::Stopwatch,
        }
    }
}

#[derive(Debug, Default)]
pub struct ModeCoordinator {
    timer_slot: Option<ModeSnapshot>,
    stopwatch_slot: Option<ModeSnapshot>,
    background: Option<BackgroundSession>,
    /// Duration a fresh Timer starts from.
    preset: Option<Duration>,
}

impl ModeCoordinator {
    pub fn new(preset: Option<Duration>) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    pub fn preset(&self) -> Option<Duration> {
        self.preset
    }

    pub fn set_preset(&mut self, preset: Duration) {
        self.preset = Some(preset);
    }

    pub fn display_mode(&self, state: &TimerState) -> DisplayMode {
        if state.is_passthrough() {
            DisplayMode::Passthrough
        } else {
            state.mode().into()
        }
    }

    pub fn background(&self) -> Option<&BackgroundSession> {
        self.background.as_ref()
    }

    /// The parked snapshot of a mode that is not displayed.
    pub fn parked(&self, mode: Mode) -> Option<&ModeSnapshot> {
        match mode {
            Mode::Timer => self.timer_slot.as_ref(),
            Mode::Stopwatch => self.stopwatch_slot.as_ref(),
        }
    }

    fn slot_mut(&mut self, mode: Mode) -> &mut Option<ModeSnapshot> {
        match mode {
            Mode::Timer => &mut self.timer_slot,
            Mode::Stopwatch => &mut self.stopwatch_slot,
        }
    }

    pub fn switch_mode<C: ClockSource, L: Listener>(
        &mut self,
        target: DisplayMode,
        state: &mut TimerState,
        engine: &mut TimingEngine<C, L>,
    ) {
        let current = self.display_mode(state);
        if current == target {
            return;
        }
        let now = engine.now();
        info!(from = ?current, to = ?target, "switching mode");

        let target_mode = match target {
            DisplayMode::Passthrough => {
                self.enter_passthrough(state, now);
                return;
            }
            DisplayMode::Timer => Mode::Timer,
            DisplayMode::Stopwatch => Mode::Stopwatch,
        };

        if state.is_passthrough() {
            self.leave_passthrough(state);
        } else {
            self.park(state, now);
        }
        self.enter(target_mode, state, engine, now);
    }

    fn park(&mut self, state: &TimerState, now: DateTime<Utc>) {
        let snapshot = capture_elapsed(state, now);
        debug!(mode = ?snapshot.mode, running = snapshot.running, elapsed_ms = snapshot.elapsed.num_milliseconds(), "parked");
        *self.slot_mut(state.mode()) = Some(snapshot);
    }

    fn enter<C: ClockSource, L: Listener>(
        &mut self,
        mode: Mode,
        state: &mut TimerState,
        engine: &mut TimingEngine<C, L>,
        now: DateTime<Utc>,
    ) {
        *state = match self.slot_mut(mode).take() {
            Some(snapshot) => {
                debug!(?mode, away_ms = (now - snapshot.captured_at).num_milliseconds(), "restoring");
                restore_elapsed(snapshot, now)
            }
            None => match mode {
                Mode::Timer => TimerState::timer(self.preset.map(Program::Flat)),
                Mode::Stopwatch => TimerState::stopwatch(),
            },
        };

        if state.is_running() && state.is_expired(now) {
            info!("countdown ran out while away");
            engine.handle_expiry(state, now);
        }
    }

    fn enter_passthrough(&mut self, state: &mut TimerState, now: DateTime<Utc>) {
        self.background = Some(BackgroundSession::capture(state, now));
        state.set_passthrough(true);
    }

    /// Hands the session back to its origin's slot; the caller then enters
    /// the target mode from that slot.
    fn leave_passthrough(&mut self, state: &mut TimerState) {
        state.set_passthrough(false);
        if let Some(session) = self.background.take() {
            let snapshot = session.into_snapshot();
            let origin = snapshot.mode;
            *self.slot_mut(origin) = Some(snapshot);
        }
    }

    /// One background poll: expiry detection for countdowns nobody is
    /// looking at. Nothing is rendered.
    pub fn background_tick<C: ClockSource, L: Listener>(&mut self, engine: &mut TimingEngine<C, L>) {
        let now = engine.now();
        if let Some(session) = self.background.as_mut() {
            engine.watch(session.snapshot_mut(), now);
        }
        if let Some(parked) = self.timer_slot.as_mut() {
            engine.watch(parked, now);
        }
    }

    /// Replaces the Timer program. From the Stopwatch this parks the
    /// stopwatch and brings the Timer up with the new program.
    pub fn load_timer(&mut self, program: Program, state: &mut TimerState, now: DateTime<Utc>) {
        if state.mode() == Mode::Stopwatch {
            self.park(state, now);
        }
        self.timer_slot = None;
        *state = TimerState::timer(Some(program));
    }

    /// True while some countdown is being tracked out of sight.
    pub fn has_unseen_countdown(&self) -> bool {
        let session_timer = self
            .background
            .as_ref()
            .map(|s| s.origin() == Mode::Timer && s.snapshot().running)
            .unwrap_or(false);
        let parked_timer = self.timer_slot.as_ref().map(|s| s.running).unwrap_or(false);
        session_timer || parked_timer
    }
}
