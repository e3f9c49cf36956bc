//! Timing core for the tempo timer: countdowns, a stopwatch, and looping
//! interval circuits.
//!
//! All time is derived from wall-clock anchors. Hosts own a [`Controller`],
//! call [`Controller::tick`] every [`RENDER_INTERVAL`] and
//! [`Controller::background_tick`] every [`BACKGROUND_INTERVAL`] from one
//! thread, and receive side effects through a [`Listener`].

pub mod alarm;
pub mod circuit;
pub mod clock;
pub mod controller;
pub mod coordinator;
pub mod definition;
pub mod engine;
pub mod error;
pub mod format;
pub mod listener;
pub mod snapshot;
pub mod state;

pub use alarm::{parse_time_of_day, AlarmBook, AlarmSpec, ClockAlarm, Repeat};
pub use circuit::{Advance, CircuitProgram, CircuitProgress, LoopPolicy, Step};
pub use clock::{ClockSource, ManualClock, SystemClock};
pub use controller::{Controller, Status};
pub use coordinator::{DisplayMode, ModeCoordinator};
pub use definition::{parse_definitions, CircuitDefinition, LoopSpec, StepSpec};
pub use engine::{ExpiryOutcome, TimingEngine, BACKGROUND_INTERVAL, RENDER_INTERVAL};
pub use error::{ConfigurationError, Result, TempoError};
pub use listener::{DisplayKind, Event, Listener, RecordingListener, RenderTick, SegmentNotification};
pub use snapshot::{capture_elapsed, restore_elapsed, BackgroundSession, ModeSnapshot};
pub use state::{Mode, Program, TimerState};

/// Upper bound for `LoopPolicy::Count`.
pub const MAX_LOOP_COUNT: u32 = 99;

/// Countdown a fresh Timer starts from when nothing else is configured.
pub const DEFAULT_TIMER_MINUTES: i64 = 10;
