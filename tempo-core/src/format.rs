//! Duration to display string, and back for typed entry.

use chrono::Duration;

const HOUR_MS: i64 = 60 * 60 * 1000;

fn whole_seconds(d: Duration) -> i64 {
    d.num_seconds().max(0)
}

/// `MM:SS`; minutes are not wrapped at 60.
pub fn format_mmss(d: Duration) -> String {
    let secs = whole_seconds(d);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `HH:MM:SS`
pub fn format_hms(d: Duration) -> String {
    let secs = whole_seconds(d);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Picks `MM:SS` for segments up to an hour and `HH:MM:SS` beyond.
pub fn format_for_total(value: Duration, total: Duration) -> String {
    if total.num_milliseconds() <= HOUR_MS {
        format_mmss(value)
    } else {
        format_hms(value)
    }
}

/// Compact label such as `1h 30s` used next to circuit progress.
pub fn format_step(d: Duration) -> String {
    let secs = whole_seconds(d);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    if s > 0 || parts.is_empty() {
        parts.push(format!("{}s", s));
    }
    parts.join(" ")
}

/// Reads a typed duration: `M`, `M:SS` or `H:MM:SS`. Fields after the
/// first must be below 60. `None` unless the result is positive and fits.
pub fn parse_hms(text: &str) -> Option<Duration> {
    let fields = text
        .trim()
        .split(':')
        .map(|f| f.parse::<i64>().ok().filter(|n| *n >= 0))
        .collect::<Option<Vec<_>>>()?;
    let (hours, minutes, seconds) = match fields.as_slice() {
        [m] => (0, *m, 0),
        [m, s] => (0, *m, *s),
        [h, m, s] if *m < 60 => (*h, *m, *s),
        _ => return None,
    };
    if seconds >= 60 {
        return None;
    }
    let total = Duration::try_hours(hours)?
        .checked_add(&Duration::try_minutes(minutes)?)?
        .checked_add(&Duration::try_seconds(seconds)?)?;
    (total > Duration::zero()).then_some(total)
}
