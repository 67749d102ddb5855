use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

mod app;
mod model;
mod process;
mod scratch;
mod ssh;
mod storage;
mod ui;

use app::App;
use app::constants::LOG_RETENTION_DAYS;
use app::ssh_backend::RealSshBackend;
use model::StageMessage;
use scratch::ScratchDir;

const TICK_RATE: Duration = Duration::from_millis(33);

fn main() -> Result<()> {
    let debug_mode = std::env::var_os("DEBUG").is_some();
    let log_dir = storage::log_dir()?;
    let (log_path, _log_guard) = app::logging::init_file_logging(
        &log_dir,
        &storage::log_file_name(debug_mode),
        debug_mode,
    )?;
    println!("backup-tui {}", env!("CARGO_PKG_VERSION"));
    println!("Logging to {}", log_path.display());
    log_startup(debug_mode);

    let pruned = storage::prune_log_dir(&log_dir, LOG_RETENTION_DAYS);
    if pruned > 0 {
        tracing::info!(pruned, "removed old log files");
    }
    process::install_interrupt_handlers();

    let scratch = ScratchDir::create()?;
    tracing::info!(path = %scratch.path().display(), "scratch dir ready");
    let config_path = storage::config_path()?;
    let settings = storage::load_settings(&config_path).unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{err:#}"), "settings unreadable, using defaults");
        model::Settings::default()
    });
    let mut app = App::new(
        scratch,
        settings,
        Some(config_path),
        log_path,
        Arc::new(RealSshBackend),
    );

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        disable_raw_mode().ok();
        return Err(err).context("enter alternate screen");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    // No-op when the session already tore down.
    app.teardown();
    for line in app.summary_lines() {
        println!("{line}");
    }
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "event loop failed");
    }
    result
}

fn log_startup(debug_mode: bool) {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), debug = debug_mode, "starting");
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw_ui(frame, app))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
        if process::take_interrupt() {
            app.dispatch(StageMessage::Interrupt);
        }
        app.poll_components();

        if app.exit.is_some() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_event_logs_without_subscriber() {
        log_startup(true);
        log_startup(false);
    }
}
