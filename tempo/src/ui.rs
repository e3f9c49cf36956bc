use crate::app::{App, Prompt, PromptKind};
use chrono::{DateTime, Duration, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph},
    Frame,
};
use tempo_core::format::{format_for_total, format_hms, format_step};
use tempo_core::{ClockSource, DisplayKind, DisplayMode, Mode, Repeat, Status};

pub fn draw<C: ClockSource>(f: &mut Frame, app: &App<C>) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(7),
            Constraint::Length(1),
        ])
        .split(area);

    let status = app.status();
    draw_header(f, chunks[0], app, &status);
    match status.display {
        DisplayMode::Passthrough => draw_clock(f, chunks[1], app, &status),
        DisplayMode::Timer | DisplayMode::Stopwatch => draw_counter(f, chunks[1], app, &status),
    }
    draw_status_bar(f, chunks[2], app, &status);

    if let Some(banner) = app.listener().banner() {
        let area = centered_rect(50, 30, f.area());
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    banner.body.clone(),
                    Style::default()
                        .fg(app.config.theme.foreground)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "press any key",
                    Style::default().fg(app.config.theme.muted),
                )),
            ])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(format!(" {} ", banner.title))
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(app.config.theme.expired))
                    .style(Style::default().bg(app.config.theme.background)),
            ),
            area,
        );
    }
    if let Some(prompt) = &app.prompt {
        draw_input_overlay(f, prompt, app);
    }
    if app.show_help {
        draw_help_overlay(f, app);
    }
}

fn draw_header<C: ClockSource>(f: &mut Frame, area: Rect, app: &App<C>, status: &Status) {
    let theme = &app.config.theme;
    let icons = &app.config.icons;
    let tab = |label: String, mode: DisplayMode| {
        let style = if status.display == mode {
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        Span::styled(label, style)
    };
    let text = Line::from(vec![
        Span::raw(icons.header_left.clone()),
        Span::styled(
            "TEMPO",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw(icons.header_right.clone()),
        Span::raw("  "),
        tab(format!("{} timer", icons.timer), DisplayMode::Timer),
        Span::raw(format!(" {} ", icons.separator)),
        tab(format!("{} stopwatch", icons.stopwatch), DisplayMode::Stopwatch),
        Span::raw(format!(" {} ", icons.separator)),
        tab(format!("{} clock", icons.clock), DisplayMode::Passthrough),
    ]);
    f.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(theme.muted)),
        ),
        area,
    );
}

/// Reads the value from the last render tick; falls back to the live status
/// before the first tick arrives.
fn counter_value<C: ClockSource>(app: &App<C>, status: &Status) -> (DisplayKind, Duration, Duration) {
    match app.listener().last_tick() {
        Some(tick) if tick.display_kind == status.display_kind => {
            (tick.display_kind, tick.value, tick.total)
        }
        _ => (status.display_kind, status.value, status.total),
    }
}

fn state_color<C: ClockSource>(app: &App<C>, status: &Status) -> Color {
    let theme = &app.config.theme;
    if status.running {
        theme.running
    } else if status.mode == Mode::Timer && status.value <= Duration::zero() {
        theme.expired
    } else {
        theme.paused
    }
}

fn draw_counter<C: ClockSource>(f: &mut Frame, area: Rect, app: &App<C>, status: &Status) {
    let theme = &app.config.theme;
    let icons = &app.config.icons;
    let (kind, value, total) = counter_value(app, status);
    let title = match kind {
        DisplayKind::Remaining => format!(" {} Timer ", icons.timer),
        DisplayKind::Elapsed => format!(" {} Stopwatch ", icons.stopwatch),
    };
    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(theme.muted)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(state_color(app, status)));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner_area);

    let time_str = match kind {
        DisplayKind::Remaining => format_for_total(value, total),
        DisplayKind::Elapsed => format_hms(value),
    };
    let state_icon = if status.running {
        &icons.play
    } else if value <= Duration::zero() {
        &icons.stop
    } else {
        &icons.pause
    };
    f.render_widget(
        Paragraph::new(format!("{} {}", state_icon, time_str))
            .style(
                Style::default()
                    .fg(theme.foreground)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center),
        v_chunks[0],
    );

    if kind == DisplayKind::Remaining && total > Duration::zero() {
        let done = (total - value).num_milliseconds() as f64 / total.num_milliseconds() as f64;
        f.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(theme.accent).bg(theme.background))
                .percent((done.clamp(0.0, 1.0) * 100.0) as u16),
            v_chunks[1],
        );
    }

    if let Some(progress) = &status.progress {
        let circuit_name = app
            .controller
            .state()
            .circuit()
            .map(|c| c.name().to_string())
            .unwrap_or_default();
        let mut spans = vec![
            Span::styled(circuit_name, Style::default().fg(theme.accent)),
            Span::raw(format!(
                " {} step {}/{} ({})",
                icons.separator,
                progress.step_index + 1,
                progress.step_count,
                format_step(progress.step_duration)
            )),
        ];
        if let Some(label) = &progress.loop_label {
            spans.push(Span::raw(format!(" {} {} {}", icons.separator, icons.repeat, label)));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans))
                .style(Style::default().fg(theme.muted))
                .alignment(Alignment::Center),
            v_chunks[2],
        );
        if let Some(note) = &progress.note {
            f.render_widget(
                Paragraph::new(note.clone())
                    .style(Style::default().fg(theme.foreground).add_modifier(Modifier::ITALIC))
                    .alignment(Alignment::Center),
                v_chunks[3],
            );
        }
    } else if status.mode == Mode::Stopwatch {
        if let Some(line) = unseen_countdown_line(app) {
            f.render_widget(
                Paragraph::new(line)
                    .style(Style::default().fg(theme.muted))
                    .alignment(Alignment::Center),
                v_chunks[2],
            );
        }
    }
}

/// One-line summary of a timer that keeps running out of sight.
fn unseen_countdown_line<C: ClockSource>(app: &App<C>) -> Option<String> {
    let coordinator = app.controller.coordinator();
    if !coordinator.has_unseen_countdown() {
        return None;
    }
    let now = app.controller.now();
    let snapshot = match coordinator.background() {
        Some(session) if session.origin() == Mode::Timer => session.snapshot(),
        _ => coordinator.parked(Mode::Timer)?,
    };
    let remaining = snapshot.remaining_at(now);
    Some(format!(
        "{} {} left",
        app.config.icons.timer,
        format_for_total(remaining, snapshot.total_duration())
    ))
}

fn draw_clock<C: ClockSource>(f: &mut Frame, area: Rect, app: &App<C>, status: &Status) {
    let theme = &app.config.theme;
    let now: DateTime<Local> = app
        .listener()
        .clock()
        .unwrap_or_else(|| app.controller.now())
        .with_timezone(&Local);
    let block = Block::default()
        .title(Span::styled(
            format!(" {} Clock ", app.config.icons.clock),
            Style::default().fg(theme.muted),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.clock));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner_area);
    f.render_widget(
        Paragraph::new(now.format("%H:%M").to_string())
            .style(Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        v_chunks[0],
    );
    f.render_widget(
        Paragraph::new(now.format("%m/%d %a").to_string())
            .style(Style::default().fg(theme.muted))
            .alignment(Alignment::Center),
        v_chunks[1],
    );
    if let Some(line) = alarm_line(app) {
        f.render_widget(
            Paragraph::new(line)
                .style(Style::default().fg(theme.clock))
                .alignment(Alignment::Center),
            v_chunks[2],
        );
    }

    let underneath = match status.mode {
        Mode::Timer => format!(
            "{} {}",
            app.config.icons.timer,
            format_for_total(status.value, status.total)
        ),
        Mode::Stopwatch => format!("{} {}", app.config.icons.stopwatch, format_hms(status.value)),
    };
    let icon = if status.running {
        &app.config.icons.play
    } else {
        &app.config.icons.pause
    };
    f.render_widget(
        Paragraph::new(format!("{} {}", icon, underneath))
            .style(Style::default().fg(state_color(app, status)))
            .alignment(Alignment::Center),
        v_chunks[3],
    );
}

fn repeat_label(repeat: Repeat) -> &'static str {
    match repeat {
        Repeat::Once => "once",
        Repeat::Daily => "daily",
    }
}

/// Pending alarms in time order; daily ones carry the repeat icon.
fn alarm_line<C: ClockSource>(app: &App<C>) -> Option<String> {
    let alarms = app.controller.clock_alarms();
    if alarms.is_empty() {
        return None;
    }
    let labels: Vec<String> = alarms
        .iter()
        .filter(|a| !a.is_triggered())
        .map(|a| match a.repeat() {
            Repeat::Daily => format!("{}{}", a.label(), app.config.icons.repeat),
            Repeat::Once => a.label(),
        })
        .collect();
    if labels.is_empty() {
        return None;
    }
    Some(format!("{} {}", app.config.icons.alarm, labels.join("  ")))
}

fn draw_status_bar<C: ClockSource>(f: &mut Frame, area: Rect, app: &App<C>, status: &Status) {
    let theme = &app.config.theme;
    let (mode_text, mode_color) = match (&app.prompt, status.display) {
        (Some(_), _) => ("INPUT", theme.paused),
        (None, DisplayMode::Timer) => ("TIMER", theme.accent),
        (None, DisplayMode::Stopwatch) => ("STOPWATCH", theme.running),
        (None, DisplayMode::Passthrough) => ("CLOCK", theme.clock),
    };
    let detail = if let Some(message) = &app.message {
        Span::styled(message.clone(), Style::default().fg(theme.expired))
    } else if let Some(i) = app.selected_circuit {
        let name = app
            .circuits
            .get(i)
            .and_then(|c| c.into_program().ok())
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        Span::raw(format!("circuit {}/{}: {}", i + 1, app.circuits.len(), name))
    } else if let Some(preset) = app.selected_preset.and_then(|i| app.config.presets.get(i)) {
        Span::raw(format!("preset {}", preset.label))
    } else {
        Span::raw("")
    };
    let help = match (&app.prompt, status.display) {
        (Some(_), _) => "enter:ok │ esc:cancel",
        (None, DisplayMode::Passthrough) => "n:back │ a/A:alarm │ x:remove │ ?:help │ q:quit",
        (None, _) => {
            "space:start/pause │ r:reset │ t/s/n:view │ 1-0:preset │ e:type │ c:circuit │ ?:help │ q:quit"
        }
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", mode_text),
                Style::default()
                    .bg(mode_color)
                    .fg(theme.background)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            detail,
            Span::raw(format!(" {} ", app.config.icons.separator)),
            Span::raw(help),
        ]))
        .block(Block::default().style(Style::default().bg(theme.background).fg(theme.muted))),
        area,
    );
}

fn draw_help_overlay<C: ClockSource>(f: &mut Frame, app: &App<C>) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);
    let theme = &app.config.theme;

    let shortcuts = [
        ("space", "Start / pause"),
        ("r", "Reset (rewinds circuits)"),
        ("t", "Timer"),
        ("s", "Stopwatch"),
        ("n", "Clock (timer keeps running)"),
        ("1-9, 0", "Pick preset"),
        ("p", "Next preset"),
        ("e", "Type a countdown"),
        ("c", "Next saved circuit"),
        ("a / A", "Alarm once / daily"),
        ("x", "Remove alarm"),
        ("?", "Toggle help"),
        ("q", "Quit"),
    ];
    let mut lines: Vec<Line> = shortcuts
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("{:>8}  ", key), Style::default().fg(theme.accent)),
                Span::styled(*action, Style::default().fg(theme.foreground)),
            ])
        })
        .collect();
    lines.push(Line::raw(""));
    for (i, preset) in app.config.presets.iter().enumerate().take(10) {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:>8}  ", (i + 1) % 10),
                Style::default().fg(theme.muted),
            ),
            Span::raw(preset.label.clone()),
        ]));
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Keys ")
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(theme.clock))
                .style(Style::default().bg(theme.background)),
        ),
        area,
    );
}

fn draw_input_overlay<C: ClockSource>(f: &mut Frame, prompt: &Prompt, app: &App<C>) {
    let theme = &app.config.theme;
    let area = centered_rect(60, 40, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {} ", prompt.kind.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.paused))
        .border_type(BorderType::Double)
        .style(Style::default().bg(theme.background));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::from(vec![
        Span::styled("▸ ", Style::default().fg(theme.foreground)),
        Span::styled(prompt.buffer.clone(), Style::default().fg(theme.foreground)),
        Span::styled(
            app.config.icons.input_cursor.clone(),
            Style::default()
                .fg(theme.foreground)
                .add_modifier(Modifier::SLOW_BLINK),
        ),
    ])];
    if prompt.kind == PromptKind::RemoveAlarm {
        lines.push(Line::raw(""));
        for (i, alarm) in app.controller.clock_alarms().iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(theme.accent)),
                Span::raw(format!("{} {}", alarm.label(), repeat_label(alarm.repeat()))),
            ]));
        }
    }
    f.render_widget(Paragraph::new(lines), inner_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
