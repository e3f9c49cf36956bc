//! Host side of the core's listener: frame model, bell and desktop alerts.

use crate::config::Alerts;
use chrono::{DateTime, Utc};
use std::io::{self, Write};
use tempo_core::{Listener, RenderTick, SegmentNotification};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub title: String,
    pub body: String,
}

impl From<&SegmentNotification> for Banner {
    fn from(notification: &SegmentNotification) -> Self {
        match notification {
            SegmentNotification::CircuitComplete { name } => Self {
                title: "Circuit complete".to_string(),
                body: name.clone(),
            },
            SegmentNotification::TimerComplete => Self {
                title: "Timer complete".to_string(),
                body: "Time's up!".to_string(),
            },
            SegmentNotification::ClockAlarm { time } => Self {
                title: "Alarm".to_string(),
                body: time.clone(),
            },
        }
    }
}

/// What the UI draws from. Updated only from engine callbacks.
#[derive(Debug, Default)]
pub struct HostListener {
    alerts: Alerts,
    last_tick: Option<RenderTick>,
    clock: Option<DateTime<Utc>>,
    banner: Option<Banner>,
}

impl HostListener {
    pub fn new(alerts: Alerts) -> Self {
        Self {
            alerts,
            ..Self::default()
        }
    }

    pub fn last_tick(&self) -> Option<&RenderTick> {
        self.last_tick.as_ref()
    }

    pub fn clock(&self) -> Option<DateTime<Utc>> {
        self.clock
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    fn ring_bell(&self) {
        let mut stdout = io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            warn!("Failed to ring terminal bell: {}", e);
        }
    }

    fn send_notification(&self, banner: &Banner) {
        if let Err(e) = notify_rust::Notification::new()
            .summary(&banner.title)
            .body(&banner.body)
            .appname("tempo")
            .show()
        {
            warn!("Failed to send notification: {}", e);
        }
    }
}

impl Listener for HostListener {
    fn on_alarm(&mut self) {
        debug!("alarm");
        if self.alerts.bell {
            self.ring_bell();
        }
    }

    fn on_segment_notification(&mut self, notification: SegmentNotification) {
        let banner = Banner::from(&notification);
        if self.alerts.desktop {
            self.send_notification(&banner);
        }
        self.banner = Some(banner);
    }

    fn on_render_tick(&mut self, tick: RenderTick) {
        self.clock = None;
        self.last_tick = Some(tick);
    }

    fn on_clock_tick(&mut self, now: DateTime<Utc>) {
        self.clock = Some(now);
    }
}
