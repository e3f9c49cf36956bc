//! Wall-clock sources.
//!
//! Everything in the engine is computed from absolute instants handed out by
//! a [`ClockSource`], never by counting ticks, so a delayed or skipped poll
//! heals itself on the next one.

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use std::cell::Cell;
use std::rc::Rc;

/// Supplies the current wall-clock instant.
pub trait ClockSource {
    fn now(&self) -> DateTime<Utc>;

    /// Wall time in the local zone, for time-of-day alarms.
    fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&Local).naive_local()
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Starts at the Unix epoch, which keeps test arithmetic readable.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_ms(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.now.set(instant);
    }

    /// Milliseconds since the clock's epoch start, for assertions.
    pub fn elapsed_ms(&self) -> i64 {
        (self.now.get() - DateTime::<Utc>::UNIX_EPOCH).num_milliseconds()
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    /// UTC stands in for the local zone so tests don't depend on the host.
    fn local_now(&self) -> NaiveDateTime {
        self.now.get().naive_utc()
    }
}

/// `later - earlier`, clamped at zero so a clock stepping backwards never
/// produces negative consumption.
pub fn since(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).max(Duration::zero())
}
