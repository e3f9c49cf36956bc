use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tempo_core::SystemClock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod circuits;
mod config;
mod feedback;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Countdown timer, stopwatch and looping interval circuits", long_about = None)]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON circuit file to load; may be given more than once
    #[arg(long = "circuit", value_name = "FILE")]
    circuits: Vec<PathBuf>,
    /// Initial countdown in minutes
    #[arg(short, long)]
    minutes: Option<i64>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(verbose: bool) -> Result<()> {
    let Some(dirs) = config::project_dirs() else {
        return Ok(());
    };
    let log_dir = dirs.data_dir();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;
    let log_path = log_dir.join("tempo.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let filter = if verbose {
        EnvFilter::new("tempo=debug,tempo_core=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tempo=info,tempo_core=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = config::load_config(cli.config.as_deref())?;
    let circuits = circuits::collect(&config.circuits, &cli.circuits)?;
    let initial = config::initial_countdown(cli.minutes, &config.timing)?;
    info!(
        initial_secs = initial.num_seconds(),
        circuits = circuits.len(),
        "starting tempo"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to build runtime")?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(SystemClock, config, circuits, initial);
    let res = runtime.block_on(run_app(&mut terminal, app));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }
    info!("tempo exited");
    Ok(())
}

/// Render poll, background poll and key input share one thread, so no two
/// of them ever run at the same time.
async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let mut render = interval(app.config.timing.render_interval());
    render.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut background = interval(app.config.timing.background_interval());
    background.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut events = EventStream::new();
    let mut redraw = true;

    loop {
        if redraw {
            terminal.draw(|f| ui::draw(f, &app))?;
        }
        if app.should_quit {
            return Ok(());
        }

        tokio::select! {
            _ = render.tick() => {
                app.refresh();
                redraw = true;
            }
            _ = background.tick() => {
                app.background_tick();
                redraw = false;
            }
            maybe_event = events.next() => {
                redraw = true;
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if key.code == KeyCode::Char('c')
                            && key.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            return Ok(());
                        }
                        app.handle_key(key.code);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                    None => return Ok(()),
                }
            }
        }
    }
}
