//! The authoritative timing record.
//!
//! Elapsed time is `accumulated + (now - anchor)` while running and
//! `accumulated` while stopped. The anchor is present exactly while the run
//! segment is live, so "running" and "has an anchor" cannot disagree.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitProgram, CircuitProgress};
use crate::clock::since;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Timer,
    Stopwatch,
}

/// What a Timer counts down: one flat segment or a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    Flat(Duration),
    Circuit(CircuitProgram),
}

impl Program {
    /// Length of the segment currently being counted.
    pub fn segment_duration(&self) -> Duration {
        match self {
            Program::Flat(d) => *d,
            Program::Circuit(circuit) => circuit.current().duration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    mode: Mode,
    passthrough: bool,
    anchor: Option<DateTime<Utc>>,
    accumulated: Duration,
    program: Option<Program>,
}

impl TimerState {
    pub fn timer(program: Option<Program>) -> Self {
        Self {
            mode: Mode::Timer,
            passthrough: false,
            anchor: None,
            accumulated: Duration::zero(),
            program,
        }
    }

    pub fn stopwatch() -> Self {
        Self {
            mode: Mode::Stopwatch,
            ..Self::timer(None)
        }
    }

    /// Rebuilds a state from frozen parts. Used when restoring snapshots.
    pub(crate) fn from_parts(
        mode: Mode,
        elapsed: Duration,
        anchor: Option<DateTime<Utc>>,
        program: Option<Program>,
    ) -> Self {
        Self {
            mode,
            passthrough: false,
            anchor,
            accumulated: elapsed,
            program: match mode {
                Mode::Timer => program,
                Mode::Stopwatch => None,
            },
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub(crate) fn set_passthrough(&mut self, on: bool) {
        self.passthrough = on;
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn circuit(&self) -> Option<&CircuitProgram> {
        match &self.program {
            Some(Program::Circuit(circuit)) => Some(circuit),
            _ => None,
        }
    }

    pub(crate) fn circuit_mut(&mut self) -> Option<&mut CircuitProgram> {
        match &mut self.program {
            Some(Program::Circuit(circuit)) => Some(circuit),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<CircuitProgress> {
        self.circuit().map(CircuitProgram::progress)
    }

    /// Length of the current segment; zero for a stopwatch or an
    /// unconfigured timer.
    pub fn total_duration(&self) -> Duration {
        self.program
            .as_ref()
            .map(Program::segment_duration)
            .unwrap_or_else(Duration::zero)
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.anchor {
            Some(anchor) => self.accumulated + since(anchor, now),
            None => self.accumulated,
        }
    }

    /// Time left in the current segment, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.total_duration() - self.elapsed(now)).max(Duration::zero())
    }

    /// True once a configured countdown segment has been fully consumed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.mode == Mode::Timer
            && self.program.is_some()
            && self.elapsed(now) >= self.total_duration()
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    /// Freezes elapsed time into `accumulated`.
    pub(crate) fn pause(&mut self, now: DateTime<Utc>) {
        if let Some(anchor) = self.anchor.take() {
            self.accumulated = self.accumulated + since(anchor, now);
        }
    }

    /// Stops with the current segment fully consumed.
    pub(crate) fn finish(&mut self) {
        self.anchor = None;
        self.accumulated = self.total_duration();
    }

    /// Starts the (new) current segment from zero at `now`, keeping the run
    /// state as it was.
    pub(crate) fn begin_segment(&mut self, now: DateTime<Utc>) {
        self.accumulated = Duration::zero();
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    /// Stops and discards progress, keeping the configured program and
    /// rewinding a circuit to its first step.
    pub(crate) fn rewind(&mut self) {
        self.anchor = None;
        self.accumulated = Duration::zero();
        if let Some(circuit) = self.circuit_mut() {
            circuit.rewind();
        }
    }

    /// Installs a new program, stopped at its start.
    pub(crate) fn load(&mut self, program: Program) {
        self.anchor = None;
        self.accumulated = Duration::zero();
        self.program = Some(program);
    }
}
