use anyhow::{Context, Result};
use directories::ProjectDirs;
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tempo_core::{AlarmSpec, CircuitDefinition, BACKGROUND_INTERVAL, RENDER_INTERVAL};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub icons: Icons,
    pub timing: Timing,
    pub alerts: Alerts,
    pub presets: Presets,
    pub circuits: Vec<CircuitDefinition>,
    pub alarms: Vec<AlarmSpec>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "hex_to_color")]
    pub background: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub foreground: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub accent: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub muted: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub running: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub paused: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub expired: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub clock: Color,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Icons {
    pub timer: String,
    pub stopwatch: String,
    pub clock: String,
    pub play: String,
    pub pause: String,
    pub stop: String,
    pub repeat: String,
    pub alarm: String,
    pub input_cursor: String,
    pub progress_filled: String,
    pub progress_empty: String,
    pub separator: String,
    pub header_left: String,
    pub header_right: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    pub render_interval_ms: u64,
    pub background_interval_ms: u64,
    pub default_preset_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Alerts {
    /// Ring the terminal bell on every alarm.
    pub bell: bool,
    /// Raise a desktop notification when a countdown or circuit finishes.
    pub desktop: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Preset {
    pub label: String,
    pub secs: i64,
}

impl Preset {
    fn new(label: &str, secs: i64) -> Self {
        Self {
            label: label.to_string(),
            secs,
        }
    }

    /// `None` when `secs` is not positive or too large for a duration.
    pub fn duration(&self) -> Option<chrono::Duration> {
        positive_seconds(self.secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Presets(pub Vec<Preset>);

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(9, 14, 19),
            foreground: Color::Rgb(197, 201, 199),
            accent: Color::Rgb(127, 180, 202),
            muted: Color::Rgb(164, 167, 164),
            running: Color::Rgb(138, 154, 123),
            paused: Color::Rgb(196, 178, 138),
            expired: Color::Rgb(228, 104, 118),
            clock: Color::Rgb(162, 146, 163),
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            timer: "⧗".to_string(),
            stopwatch: "Δ".to_string(),
            clock: "◷".to_string(),
            play: "▶".to_string(),
            pause: "⏸".to_string(),
            stop: "■".to_string(),
            repeat: "↻".to_string(),
            alarm: "⏰".to_string(),
            input_cursor: "▊".to_string(),
            progress_filled: "█".to_string(),
            progress_empty: "░".to_string(),
            separator: "│".to_string(),
            header_left: "⟪ ".to_string(),
            header_right: " ⟫".to_string(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            render_interval_ms: RENDER_INTERVAL.as_millis() as u64,
            background_interval_ms: BACKGROUND_INTERVAL.as_millis() as u64,
            default_preset_secs: tempo_core::DEFAULT_TIMER_MINUTES * 60,
        }
    }
}

impl Timing {
    pub fn render_interval(&self) -> StdDuration {
        non_zero_or(self.render_interval_ms, RENDER_INTERVAL)
    }

    pub fn background_interval(&self) -> StdDuration {
        non_zero_or(self.background_interval_ms, BACKGROUND_INTERVAL)
    }
}

fn positive_seconds(secs: i64) -> Option<chrono::Duration> {
    chrono::Duration::try_seconds(secs).filter(|d| *d > chrono::Duration::zero())
}

/// The countdown the app opens with: `--minutes` if given, else the
/// configured default.
pub fn initial_countdown(minutes: Option<i64>, timing: &Timing) -> Result<chrono::Duration> {
    let initial = match minutes {
        Some(m) => chrono::Duration::try_minutes(m).filter(|d| *d > chrono::Duration::zero()),
        None => positive_seconds(timing.default_preset_secs),
    };
    initial.context("initial countdown must be a positive duration")
}

fn non_zero_or(millis: u64, fallback: StdDuration) -> StdDuration {
    if millis == 0 {
        fallback
    } else {
        StdDuration::from_millis(millis)
    }
}

impl Default for Alerts {
    fn default() -> Self {
        Self {
            bell: true,
            desktop: true,
        }
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self(vec![
            Preset::new("10s", 10),
            Preset::new("15s", 15),
            Preset::new("30s", 30),
            Preset::new("1m", 60),
            Preset::new("1m 30s", 90),
            Preset::new("2m", 120),
            Preset::new("3m", 180),
            Preset::new("5m", 300),
            Preset::new("10m", 600),
            Preset::new("15m", 900),
            Preset::new("30m", 1800),
            Preset::new("1h", 3600),
        ])
    }
}

impl Presets {
    pub fn get(&self, index: usize) -> Option<&Preset> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.0.iter()
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    if !s.is_ascii() || !s.starts_with('#') || s.len() != 7 {
        return Err(serde::de::Error::custom("invalid hex color format"));
    }
    let r = u8::from_str_radix(&s[1..3], 16).map_err(serde::de::Error::custom)?;
    let g = u8::from_str_radix(&s[3..5], 16).map_err(serde::de::Error::custom)?;
    let b = u8::from_str_radix(&s[5..7], 16).map_err(serde::de::Error::custom)?;
    Ok(Color::Rgb(r, g, b))
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "pabloagn", "Tempo")
}

pub fn default_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("tempo.toml"))
}

/// Loads `override_path` if given, else `tempo.toml` in the platform config
/// dir. A missing default file means defaults; a missing override is an error.
pub fn load_config(override_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = override_path {
        return load_from(path);
    }
    match default_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {:?}", path))?;
    toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file at {:?}", path))
}
