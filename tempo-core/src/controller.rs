//! The surface hosts drive: configuration, run control, mode switching and
//! the two poll entry points.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::alarm::{AlarmBook, ClockAlarm, Repeat};
use crate::circuit::{CircuitProgram, CircuitProgress, LoopPolicy, Step};
use crate::clock::ClockSource;
use crate::coordinator::{DisplayMode, ModeCoordinator};
use crate::definition::CircuitDefinition;
use crate::engine::TimingEngine;
use crate::error::{ConfigurationError, Result, TempoError};
use crate::listener::{DisplayKind, Listener};
use crate::state::{Mode, Program, TimerState};

/// Point-in-time view for hosts that draw between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub display: DisplayMode,
    pub mode: Mode,
    pub running: bool,
    pub display_kind: DisplayKind,
    pub value: Duration,
    pub total: Duration,
    pub progress: Option<CircuitProgress>,
}

/// Owns the single [`TimerState`] and hands it to the engine and the
/// coordinator by reference.
pub struct Controller<C, L> {
    state: TimerState,
    engine: TimingEngine<C, L>,
    coordinator: ModeCoordinator,
    alarms: AlarmBook,
}

impl<C: ClockSource, L: Listener> Controller<C, L> {
    /// Starts in Timer mode loaded with `preset`, if any.
    pub fn new(clock: C, listener: L, preset: Option<Duration>) -> Self {
        let preset = preset.filter(|d| *d > Duration::zero());
        Self {
            state: TimerState::timer(preset.map(Program::Flat)),
            engine: TimingEngine::new(clock, listener),
            coordinator: ModeCoordinator::new(preset),
            alarms: AlarmBook::new(),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn coordinator(&self) -> &ModeCoordinator {
        &self.coordinator
    }

    pub fn listener(&self) -> &L {
        self.engine.listener()
    }

    pub fn listener_mut(&mut self) -> &mut L {
        self.engine.listener_mut()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.engine.now()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.coordinator.display_mode(&self.state)
    }

    fn ensure_controls_visible(&self, action: &'static str) -> Result<()> {
        if self.state.is_passthrough() {
            warn!(action, "ignored while the clock overlay is shown");
            return Err(TempoError::InvalidTransition(
                "controls are unavailable while the clock is shown",
            ));
        }
        Ok(())
    }

    /// Replaces the program with a single countdown and makes it the preset
    /// a fresh Timer starts from. Clears any circuit.
    pub fn configure_flat_countdown(&mut self, duration: Duration) -> Result<()> {
        self.ensure_controls_visible("configure")?;
        if duration <= Duration::zero() {
            let err = ConfigurationError::NonPositiveDuration {
                millis: duration.num_milliseconds(),
            };
            warn!(%err, "rejected countdown");
            return Err(err.into());
        }
        let now = self.engine.now();
        self.coordinator.set_preset(duration);
        self.coordinator
            .load_timer(Program::Flat(duration), &mut self.state, now);
        info!(duration_ms = duration.num_milliseconds(), "flat countdown configured");
        Ok(())
    }

    pub fn select_preset(&mut self, duration: Duration) -> Result<()> {
        self.configure_flat_countdown(duration)
    }

    pub fn configure_circuit(&mut self, steps: Vec<Step>, loop_policy: LoopPolicy) -> Result<()> {
        self.install(CircuitProgram::new(steps, loop_policy))
    }

    pub fn configure_named_circuit(
        &mut self,
        name: &str,
        steps: Vec<Step>,
        loop_policy: LoopPolicy,
    ) -> Result<()> {
        self.install(CircuitProgram::named(name, steps, loop_policy))
    }

    pub fn configure_definition(&mut self, definition: &CircuitDefinition) -> Result<()> {
        self.install(definition.into_program())
    }

    fn install(
        &mut self,
        program: std::result::Result<CircuitProgram, ConfigurationError>,
    ) -> Result<()> {
        self.ensure_controls_visible("configure")?;
        let program = program.map_err(|err| {
            warn!(%err, "rejected circuit");
            TempoError::from(err)
        })?;
        let now = self.engine.now();
        info!(circuit = %program.name(), steps = program.step_count(), "circuit configured");
        self.coordinator
            .load_timer(Program::Circuit(program), &mut self.state, now);
        Ok(())
    }

    /// Time-of-day alarms are independent of the display, so they can be
    /// edited while the clock overlay is up.
    pub fn add_clock_alarm(&mut self, hour: u32, minute: u32, repeat: Repeat) -> Result<()> {
        self.alarms.add(hour, minute, repeat).map_err(|err| {
            warn!(%err, "rejected alarm");
            TempoError::from(err)
        })
    }

    pub fn remove_clock_alarm(&mut self, index: usize) -> Option<ClockAlarm> {
        self.alarms.remove(index)
    }

    pub fn clock_alarms(&self) -> &[ClockAlarm] {
        self.alarms.alarms()
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure_controls_visible("start")?;
        self.engine.start(&mut self.state)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_controls_visible("pause")?;
        self.engine.pause(&mut self.state);
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.state.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    pub fn reset(&mut self) -> Result<()> {
        self.ensure_controls_visible("reset")?;
        self.engine.reset(&mut self.state);
        Ok(())
    }

    pub fn switch_mode(&mut self, target: DisplayMode) {
        self.coordinator
            .switch_mode(target, &mut self.state, &mut self.engine);
    }

    /// Visible poll; call every [`crate::RENDER_INTERVAL`].
    pub fn tick(&mut self) {
        self.engine.tick(&mut self.state);
    }

    /// Background poll; call every [`crate::BACKGROUND_INTERVAL`]. Also
    /// rings any time-of-day alarm whose minute has come.
    pub fn background_tick(&mut self) {
        self.coordinator.background_tick(&mut self.engine);
        if self.alarms.is_empty() {
            return;
        }
        let now = self.engine.clock().local_now();
        for alarm in self.alarms.due(now) {
            self.engine.ring(&alarm);
        }
    }

    pub fn status(&self) -> Status {
        let now = self.engine.now();
        let display = self.display_mode();
        let (mode, running, elapsed, total, progress) =
            match (display, self.coordinator.background()) {
                (DisplayMode::Passthrough, Some(session)) => {
                    let snapshot = session.snapshot();
                    (
                        snapshot.mode,
                        snapshot.running,
                        snapshot.elapsed_at(now),
                        snapshot.total_duration(),
                        match &snapshot.program {
                            Some(Program::Circuit(circuit)) => Some(circuit.progress()),
                            _ => None,
                        },
                    )
                }
                _ => (
                    self.state.mode(),
                    self.state.is_running(),
                    self.state.elapsed(now),
                    self.state.total_duration(),
                    self.state.progress(),
                ),
            };
        let (display_kind, value) = match mode {
            Mode::Timer => (
                DisplayKind::Remaining,
                (total - elapsed).max(Duration::zero()),
            ),
            Mode::Stopwatch => (DisplayKind::Elapsed, elapsed),
        };
        Status {
            display,
            mode,
            running,
            display_kind,
            value,
            total,
            progress,
        }
    }
}
