//! Side-effect collaborators driven by the engine.
//!
//! Every callback is fire-and-forget: the engine never looks at what a
//! listener did, and a listener never touches timing state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use crate::circuit::CircuitProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayKind {
    Remaining,
    Elapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTick {
    pub display_kind: DisplayKind,
    pub value: Duration,
    /// Length of the current segment; zero for the stopwatch.
    pub total: Duration,
    pub circuit_progress: Option<CircuitProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentNotification {
    CircuitComplete { name: String },
    TimerComplete,
    /// A time-of-day alarm rang; `time` is `HH:MM`.
    ClockAlarm { time: String },
}

pub trait Listener {
    fn on_alarm(&mut self);

    fn on_segment_notification(&mut self, notification: SegmentNotification);

    fn on_render_tick(&mut self, tick: RenderTick);

    /// Called on every render poll while the clock overlay is shown.
    fn on_clock_tick(&mut self, _now: DateTime<Utc>) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Alarm,
    Notification(SegmentNotification),
    Render(RenderTick),
    Clock(DateTime<Utc>),
}

/// Records every callback. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn alarms(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Alarm))
            .count()
    }

    pub fn notifications(&self) -> Vec<SegmentNotification> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Notification(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_render(&self) -> Option<RenderTick> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            Event::Render(tick) => Some(tick.clone()),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Listener for RecordingListener {
    fn on_alarm(&mut self) {
        self.events.borrow_mut().push(Event::Alarm);
    }

    fn on_segment_notification(&mut self, notification: SegmentNotification) {
        self.events
            .borrow_mut()
            .push(Event::Notification(notification));
    }

    fn on_render_tick(&mut self, tick: RenderTick) {
        self.events.borrow_mut().push(Event::Render(tick));
    }

    fn on_clock_tick(&mut self, now: DateTime<Utc>) {
        self.events.borrow_mut().push(Event::Clock(now));
    }
}
