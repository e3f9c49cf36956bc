//! Frozen copies of a mode's timing taken when the user looks away from it.
//!
//! One capture/restore pair serves all three transition paths (Timer,
//! Stopwatch and the passthrough background session).

use chrono::{DateTime, Duration, Utc};

use crate::clock::since;
use crate::state::{Mode, Program, TimerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub running: bool,
    /// Elapsed time of the current segment as of `captured_at`.
    pub elapsed: Duration,
    /// Owned copy of the program; never shared with the other mode.
    pub program: Option<Program>,
    pub captured_at: DateTime<Utc>,
}

impl ModeSnapshot {
    pub fn total_duration(&self) -> Duration {
        self.program
            .as_ref()
            .map(Program::segment_duration)
            .unwrap_or_else(Duration::zero)
    }

    /// Elapsed time as of `now`, counting the time spent away if the run
    /// was live.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        if self.running {
            self.elapsed + since(self.captured_at, now)
        } else {
            self.elapsed
        }
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.total_duration() - self.elapsed_at(now)).max(Duration::zero())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.mode == Mode::Timer
            && self.program.is_some()
            && self.elapsed_at(now) >= self.total_duration()
    }
}

/// Freezes `state` as of `now`.
pub fn capture_elapsed(state: &TimerState, now: DateTime<Utc>) -> ModeSnapshot {
    ModeSnapshot {
        mode: state.mode(),
        running: state.is_running(),
        elapsed: state.elapsed(now),
        program: state.program().cloned(),
        captured_at: now,
    }
}

/// Thaws a snapshot into a live state as of `now`. A running snapshot comes
/// back running with the time spent away already consumed.
pub fn restore_elapsed(snapshot: ModeSnapshot, now: DateTime<Utc>) -> TimerState {
    let elapsed = snapshot.elapsed_at(now);
    let anchor = snapshot.running.then_some(now);
    TimerState::from_parts(snapshot.mode, elapsed, anchor, snapshot.program)
}

/// The run that keeps going unseen while the clock overlay is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundSession {
    snapshot: ModeSnapshot,
}

impl BackgroundSession {
    pub fn capture(state: &TimerState, now: DateTime<Utc>) -> Self {
        Self {
            snapshot: capture_elapsed(state, now),
        }
    }

    /// The mode the overlay was entered from.
    pub fn origin(&self) -> Mode {
        self.snapshot.mode
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.snapshot.captured_at
    }

    /// Time spent behind the overlay since the last capture.
    pub fn time_away(&self, now: DateTime<Utc>) -> Duration {
        since(self.snapshot.captured_at, now)
    }

    pub fn snapshot(&self) -> &ModeSnapshot {
        &self.snapshot
    }

    pub(crate) fn snapshot_mut(&mut self) -> &mut ModeSnapshot {
        &mut self.snapshot
    }

    pub fn into_snapshot(self) -> ModeSnapshot {
        self.snapshot
    }
}
