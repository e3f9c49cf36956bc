//! Time-of-day alarms, independent of the countdown and the stopwatch.
//!
//! An alarm fires at most once per calendar day, on the first check that
//! lands inside its minute. Checks run from the background poll, so a slow
//! or skipped poll still fires as long as one lands inside the minute.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    Once,
    #[default]
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockAlarm {
    time: NaiveTime,
    repeat: Repeat,
    last_fired: Option<NaiveDate>,
}

impl ClockAlarm {
    pub fn repeat(&self) -> Repeat {
        self.repeat
    }

    /// `HH:MM`
    pub fn label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    /// A one-shot alarm that has already rung and waits to be dropped.
    pub fn is_triggered(&self) -> bool {
        self.repeat == Repeat::Once && self.last_fired.is_some()
    }

    fn is_due(&self, now: NaiveDateTime) -> bool {
        !self.is_triggered()
            && self.time.hour() == now.hour()
            && self.time.minute() == now.minute()
            && self.last_fired != Some(now.date())
    }
}

/// Alarms kept sorted by time of day.
#[derive(Debug, Clone, Default)]
pub struct AlarmBook {
    alarms: Vec<ClockAlarm>,
}

impl AlarmBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alarms(&self) -> &[ClockAlarm] {
        &self.alarms
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn add(&mut self, hour: u32, minute: u32, repeat: Repeat) -> Result<(), ConfigurationError> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or_else(|| ConfigurationError::InvalidAlarmTime(format!("{hour}:{minute}")))?;
        if self
            .alarms
            .iter()
            .any(|a| a.time == time && a.repeat == repeat)
        {
            return Err(ConfigurationError::DuplicateAlarm(
                time.format("%H:%M").to_string(),
            ));
        }
        let index = self.alarms.partition_point(|a| a.time <= time);
        self.alarms.insert(
            index,
            ClockAlarm {
                time,
                repeat,
                last_fired: None,
            },
        );
        info!(time = %time.format("%H:%M"), ?repeat, "alarm added");
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<ClockAlarm> {
        if index >= self.alarms.len() {
            return None;
        }
        let alarm = self.alarms.remove(index);
        info!(time = %alarm.label(), "alarm removed");
        Some(alarm)
    }

    /// Alarms whose minute is `now`. One-shot alarms stay listed as
    /// triggered until the next day's first check drops them.
    pub fn due(&mut self, now: NaiveDateTime) -> Vec<ClockAlarm> {
        let today = now.date();
        let before = self.alarms.len();
        self.alarms
            .retain(|a| !(a.is_triggered() && a.last_fired.is_some_and(|day| day < today)));
        if self.alarms.len() != before {
            debug!(dropped = before - self.alarms.len(), "one-shot alarms expired");
        }

        let mut fired = Vec::new();
        for alarm in self.alarms.iter_mut().filter(|a| a.is_due(now)) {
            alarm.last_fired = Some(today);
            fired.push(alarm.clone());
        }
        fired
    }
}

/// Parses `H:MM` / `HH:MM`.
pub fn parse_time_of_day(text: &str) -> Result<(u32, u32), ConfigurationError> {
    let invalid = || ConfigurationError::InvalidAlarmTime(text.to_string());
    let (hour, minute) = text.trim().split_once(':').ok_or_else(invalid)?;
    let hour = hour.parse::<u32>().map_err(|_| invalid())?;
    let minute = minute.parse::<u32>().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// An alarm as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSpec {
    pub time: String,
    #[serde(default)]
    pub repeat: Repeat,
}

impl AlarmSpec {
    pub fn time_of_day(&self) -> Result<(u32, u32), ConfigurationError> {
        parse_time_of_day(&self.time)
    }
}
