use crate::config::Config;
use crate::feedback::HostListener;
use chrono::Duration;
use crossterm::event::KeyCode;
use tempo_core::format::parse_hms;
use tempo_core::{
    parse_time_of_day, CircuitDefinition, ClockSource, Controller, DisplayMode, Repeat, Status,
    SystemClock, TempoError,
};
use tracing::{debug, info, warn};

/// Longest thing anyone types into a prompt (`HHH:MM:SS`).
const PROMPT_MAX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Duration,
    Alarm(Repeat),
    RemoveAlarm,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Duration => "Countdown (M, M:SS or H:MM:SS)",
            PromptKind::Alarm(Repeat::Once) => "Alarm once (HH:MM)",
            PromptKind::Alarm(Repeat::Daily) => "Alarm daily (HH:MM)",
            PromptKind::RemoveAlarm => "Remove alarm (number)",
        }
    }
}

/// Line being typed; keys go here instead of the shortcuts while open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

pub struct App<C: ClockSource = SystemClock> {
    pub controller: Controller<C, HostListener>,
    pub config: Config,
    pub circuits: Vec<CircuitDefinition>,
    pub selected_circuit: Option<usize>,
    pub selected_preset: Option<usize>,
    pub show_help: bool,
    pub prompt: Option<Prompt>,
    pub should_quit: bool,
    /// Last rejected action, shown in the status bar until the next key.
    pub message: Option<String>,
}

impl<C: ClockSource> App<C> {
    pub fn new(
        clock: C,
        config: Config,
        circuits: Vec<CircuitDefinition>,
        initial: Duration,
    ) -> Self {
        let listener = HostListener::new(config.alerts.clone());
        let selected_preset = config
            .presets
            .iter()
            .position(|p| p.duration() == Some(initial));
        let mut controller = Controller::new(clock, listener, Some(initial));
        for spec in &config.alarms {
            let added = spec
                .time_of_day()
                .map_err(TempoError::from)
                .and_then(|(hour, minute)| controller.add_clock_alarm(hour, minute, spec.repeat));
            if let Err(err) = added {
                warn!(time = %spec.time, %err, "skipping configured alarm");
            }
        }
        let mut app = Self {
            controller,
            config,
            circuits,
            selected_preset,
            selected_circuit: None,
            show_help: false,
            prompt: None,
            should_quit: false,
            message: None,
        };
        app.refresh();
        app
    }

    pub fn status(&self) -> Status {
        self.controller.status()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.controller.display_mode()
    }

    pub fn listener(&self) -> &HostListener {
        self.controller.listener()
    }

    /// Visible poll; also run after every key so the frame reflects it.
    pub fn refresh(&mut self) {
        self.controller.tick();
    }

    pub fn background_tick(&mut self) {
        self.controller.background_tick();
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        self.message = None;
        self.controller.listener_mut().dismiss_banner();

        if self.show_help {
            if matches!(code, KeyCode::Char('?') | KeyCode::Esc) {
                self.show_help = false;
            } else if code == KeyCode::Char('q') {
                self.should_quit = true;
            }
            return;
        }

        if self.prompt.is_some() {
            let result = self.handle_prompt_key(code);
            self.report(result);
            self.refresh();
            return;
        }

        let result = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char('?') => {
                self.show_help = true;
                Ok(())
            }
            KeyCode::Char(' ') => self.controller.toggle(),
            KeyCode::Char('r') => self.controller.reset(),
            KeyCode::Char('t') => self.switch(DisplayMode::Timer),
            KeyCode::Char('s') => self.switch(DisplayMode::Stopwatch),
            KeyCode::Char('n') => self.toggle_clock(),
            KeyCode::Char('c') => self.next_circuit(),
            KeyCode::Char('p') => self.next_preset(),
            KeyCode::Char('e') => self.open_prompt(PromptKind::Duration),
            KeyCode::Char('a') => self.open_prompt(PromptKind::Alarm(Repeat::Once)),
            KeyCode::Char('A') => self.open_prompt(PromptKind::Alarm(Repeat::Daily)),
            KeyCode::Char('x') => {
                if self.controller.clock_alarms().is_empty() {
                    self.message = Some("no alarms set".to_string());
                    Ok(())
                } else {
                    self.open_prompt(PromptKind::RemoveAlarm)
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() => match c.to_digit(10) {
                // 1-9 then 0 for the tenth
                Some(0) => self.pick_preset(9),
                Some(n) => self.pick_preset(n as usize - 1),
                None => Ok(()),
            },
            _ => Ok(()),
        };

        self.report(result);
        self.refresh();
    }

    fn report(&mut self, result: Result<(), TempoError>) {
        if let Err(err) = result {
            debug!(%err, "key rejected");
            self.message = Some(err.to_string());
        }
    }

    fn open_prompt(&mut self, kind: PromptKind) -> Result<(), TempoError> {
        self.prompt = Some(Prompt {
            kind,
            buffer: String::new(),
        });
        Ok(())
    }

    fn handle_prompt_key(&mut self, code: KeyCode) -> Result<(), TempoError> {
        let Some(prompt) = self.prompt.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Backspace => {
                prompt.buffer.pop();
            }
            KeyCode::Char(c)
                if (c.is_ascii_digit() || c == ':') && prompt.buffer.len() < PROMPT_MAX_LEN =>
            {
                prompt.buffer.push(c);
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    return self.submit(prompt);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn submit(&mut self, prompt: Prompt) -> Result<(), TempoError> {
        let text = prompt.buffer.trim();
        match prompt.kind {
            PromptKind::Duration => {
                let Some(duration) = parse_hms(text) else {
                    self.message = Some(format!("not a countdown: {:?}", text));
                    return Ok(());
                };
                self.controller.configure_flat_countdown(duration)?;
                info!(duration_secs = duration.num_seconds(), "custom countdown set");
                self.selected_preset = self
                    .config
                    .presets
                    .iter()
                    .position(|p| p.duration() == Some(duration));
                self.selected_circuit = None;
            }
            PromptKind::Alarm(repeat) => {
                let (hour, minute) = parse_time_of_day(text)?;
                self.controller.add_clock_alarm(hour, minute, repeat)?;
            }
            PromptKind::RemoveAlarm => {
                let removed = text
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| self.controller.remove_clock_alarm(i));
                if removed.is_none() {
                    self.message = Some(format!("no alarm #{}", text));
                }
            }
        }
        Ok(())
    }

    fn switch(&mut self, target: DisplayMode) -> Result<(), TempoError> {
        self.controller.switch_mode(target);
        Ok(())
    }

    /// `n` shows the clock, and from the clock returns to the mode underneath.
    fn toggle_clock(&mut self) -> Result<(), TempoError> {
        let target = match self.controller.coordinator().background() {
            Some(session) if self.display_mode() == DisplayMode::Passthrough => {
                session.origin().into()
            }
            _ => DisplayMode::Passthrough,
        };
        self.switch(target)
    }

    fn pick_preset(&mut self, index: usize) -> Result<(), TempoError> {
        let Some(preset) = self.config.presets.get(index) else {
            return Ok(());
        };
        let Some(duration) = preset.duration() else {
            self.message = Some(format!("preset {} is not a usable duration", preset.label));
            return Ok(());
        };
        self.controller.select_preset(duration)?;
        info!(preset = %preset.label, "preset selected");
        self.selected_preset = Some(index);
        self.selected_circuit = None;
        Ok(())
    }

    fn next_preset(&mut self) -> Result<(), TempoError> {
        if self.config.presets.is_empty() {
            return Ok(());
        }
        let next = self
            .selected_preset
            .map(|i| (i + 1) % self.config.presets.len())
            .unwrap_or(0);
        self.pick_preset(next)
    }

    fn next_circuit(&mut self) -> Result<(), TempoError> {
        if self.circuits.is_empty() {
            self.message = Some("no saved circuits".to_string());
            return Ok(());
        }
        let next = self
            .selected_circuit
            .map(|i| (i + 1) % self.circuits.len())
            .unwrap_or(0);
        self.controller.configure_definition(&self.circuits[next])?;
        self.selected_circuit = Some(next);
        self.selected_preset = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Alerts, Preset, Presets};
    use tempo_core::{parse_definitions, DisplayKind, ManualClock};

    fn quiet() -> Config {
        Config {
            alerts: Alerts {
                bell: false,
                desktop: false,
            },
            ..Config::default()
        }
    }

    fn type_line(app: &mut App<ManualClock>, line: &str) {
        for c in line.chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
    }

    fn app(circuits: &str) -> (App<ManualClock>, ManualClock) {
        let clock = ManualClock::at_epoch();
        let config = quiet();
        let circuits = if circuits.is_empty() {
            vec![]
        } else {
            parse_definitions(circuits).unwrap()
        };
        let app = App::new(clock.clone(), config, circuits, Duration::minutes(10));
        (app, clock)
    }

    #[test]
    fn test_starts_on_ten_minute_preset() {
        let (app, _) = app("");
        assert_eq!(app.selected_preset, Some(8));
        let tick = app.listener().last_tick().unwrap();
        assert_eq!(tick.display_kind, DisplayKind::Remaining);
        assert_eq!(tick.value, Duration::minutes(10));
    }

    #[test]
    fn test_space_toggles_and_frame_follows_clock() {
        let (mut app, clock) = app("");
        app.handle_key(KeyCode::Char(' '));
        assert!(app.status().running);
        clock.advance_ms(2_000);
        app.refresh();
        assert_eq!(
            app.listener().last_tick().unwrap().value,
            Duration::seconds(598)
        );
        app.handle_key(KeyCode::Char(' '));
        assert!(!app.status().running);
    }

    #[test]
    fn test_digit_keys_pick_presets() {
        let (mut app, _) = app("");
        app.handle_key(KeyCode::Char('1'));
        assert_eq!(app.status().total, Duration::seconds(10));
        app.handle_key(KeyCode::Char('0'));
        assert_eq!(app.status().total, Duration::minutes(15));
        assert_eq!(app.selected_preset, Some(9));
        app.handle_key(KeyCode::Char('p'));
        assert_eq!(app.status().total, Duration::minutes(30));
    }

    #[test]
    fn test_clock_key_round_trips_to_origin() {
        let (mut app, clock) = app("");
        app.handle_key(KeyCode::Char('s'));
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Char('n'));
        assert_eq!(app.display_mode(), DisplayMode::Passthrough);
        assert!(app.listener().clock().is_some());

        app.handle_key(KeyCode::Char(' '));
        assert!(app.message.is_some());

        clock.advance_ms(5_000);
        app.handle_key(KeyCode::Char('n'));
        assert_eq!(app.display_mode(), DisplayMode::Stopwatch);
        assert!(app.message.is_none());
        assert_eq!(app.listener().last_tick().unwrap().value, Duration::seconds(5));
    }

    #[test]
    fn test_circuit_key_cycles_saved_circuits() {
        let (mut app, clock) = app(
            r#"[{"name":"Short","steps":[1000]},{"steps":[2000,3000],"loop":{"mode":"infinite"}}]"#,
        );
        app.handle_key(KeyCode::Char('c'));
        assert_eq!(app.selected_circuit, Some(0));
        assert_eq!(app.selected_preset, None);
        app.handle_key(KeyCode::Char(' '));
        clock.advance_ms(1_000);
        app.refresh();
        let banner = app.listener().banner().unwrap();
        assert_eq!(banner.body, "Short");

        app.handle_key(KeyCode::Char('c'));
        let progress = app.status().progress.unwrap();
        assert_eq!(progress.loop_label.as_deref(), Some("∞ Loop 1"));
        app.handle_key(KeyCode::Char('c'));
        assert_eq!(app.selected_circuit, Some(0));
    }

    #[test]
    fn test_help_swallows_keys_until_closed() {
        let (mut app, _) = app("");
        app.handle_key(KeyCode::Char('?'));
        app.handle_key(KeyCode::Char(' '));
        assert!(app.show_help);
        assert!(!app.status().running);
        app.handle_key(KeyCode::Esc);
        assert!(!app.show_help);
        assert!(!app.should_quit);
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_typed_countdown_replaces_program() {
        let (mut app, _) = app(r#"[{"name":"Short","steps":[1000]}]"#);
        app.handle_key(KeyCode::Char('c'));
        app.handle_key(KeyCode::Char('e'));
        assert_eq!(app.prompt.as_ref().unwrap().kind, PromptKind::Duration);

        // shortcuts are swallowed while typing
        app.handle_key(KeyCode::Char(' '));
        app.handle_key(KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert!(!app.status().running);

        type_line(&mut app, "1:02:30");
        assert!(app.prompt.is_none());
        assert_eq!(app.status().total, Duration::seconds(3750));
        assert_eq!(app.controller.state().circuit(), None);
        assert_eq!(app.selected_circuit, None);
        assert_eq!(app.selected_preset, None);

        app.handle_key(KeyCode::Char('e'));
        type_line(&mut app, "5");
        assert_eq!(app.status().total, Duration::minutes(5));
        assert_eq!(app.selected_preset, Some(7));
    }

    #[test]
    fn test_bad_typed_countdown_keeps_program() {
        let (mut app, _) = app("");
        app.handle_key(KeyCode::Char('e'));
        app.handle_key(KeyCode::Char('9'));
        app.handle_key(KeyCode::Backspace);
        type_line(&mut app, "1:75");
        assert!(app.message.as_deref().unwrap().contains("not a countdown"));
        assert_eq!(app.status().total, Duration::minutes(10));

        app.handle_key(KeyCode::Char('e'));
        app.handle_key(KeyCode::Char('3'));
        app.handle_key(KeyCode::Esc);
        assert!(app.prompt.is_none());
        assert!(!app.should_quit);
        assert_eq!(app.status().total, Duration::minutes(10));
    }

    #[test]
    fn test_alarm_keys_add_ring_and_remove() {
        let (mut app, clock) = app("");
        app.handle_key(KeyCode::Char('x'));
        assert_eq!(app.message.as_deref(), Some("no alarms set"));

        app.handle_key(KeyCode::Char('a'));
        type_line(&mut app, "0:01");
        app.handle_key(KeyCode::Char('A'));
        type_line(&mut app, "7:00");
        app.handle_key(KeyCode::Char('a'));
        type_line(&mut app, "0:01");
        assert!(app.message.as_deref().unwrap().contains("already exists"));
        let labels: Vec<_> = app
            .controller
            .clock_alarms()
            .iter()
            .map(|a| a.label())
            .collect();
        assert_eq!(labels, vec!["00:01", "07:00"]);

        clock.advance_ms(60_000);
        app.background_tick();
        let banner = app.listener().banner().unwrap();
        assert_eq!(banner.title, "Alarm");
        assert_eq!(banner.body, "00:01");

        app.handle_key(KeyCode::Char('x'));
        type_line(&mut app, "2");
        assert_eq!(app.controller.clock_alarms().len(), 1);
        app.handle_key(KeyCode::Char('x'));
        type_line(&mut app, "5");
        assert_eq!(app.message.as_deref(), Some("no alarm #5"));
    }

    #[test]
    fn test_configured_alarms_installed_and_bad_ones_skipped() {
        let config = Config {
            alarms: vec![
                tempo_core::AlarmSpec {
                    time: "06:15".to_string(),
                    repeat: Repeat::Daily,
                },
                tempo_core::AlarmSpec {
                    time: "25:00".to_string(),
                    repeat: Repeat::Once,
                },
            ],
            ..quiet()
        };
        let app = App::new(ManualClock::at_epoch(), config, vec![], Duration::minutes(10));
        assert_eq!(app.controller.clock_alarms().len(), 1);
        assert_eq!(app.controller.clock_alarms()[0].label(), "06:15");
    }

    #[test]
    fn test_out_of_range_preset_is_reported() {
        let config = Config {
            presets: Presets(vec![Preset {
                label: "forever".to_string(),
                secs: i64::MAX,
            }]),
            ..quiet()
        };
        let mut app = App::new(ManualClock::at_epoch(), config, vec![], Duration::minutes(10));
        assert_eq!(app.selected_preset, None);
        app.handle_key(KeyCode::Char('1'));
        assert!(app.message.as_deref().unwrap().contains("forever"));
        assert_eq!(app.status().total, Duration::minutes(10));
    }
}
