use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::app::constants::{LOG_MAX_IN_MEMORY, LOG_SEPARATOR, LOG_TIMESTAMP_FORMAT};

impl App {
    pub(crate) fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(stage = self.stage.label(), "{message}");
        self.status = message.clone();
        self.log_line(&message);
    }

    /// Recorded in the log panel only when the session runs with debug on.
    pub(crate) fn debug_line(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(stage = self.stage.label(), "{message}");
        if self.params.as_ref().is_some_and(|params| params.flags.debug) {
            self.log_line(&message);
        }
    }

    pub(super) fn log_line(&mut self, message: &str) {
        let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT);
        let line = format!("{timestamp}{LOG_SEPARATOR}{message}");
        self.log_lines.push_back(line);
        while self.log_lines.len() > LOG_MAX_IN_MEMORY {
            self.log_lines.pop_front();
        }
    }
}

/// Sends every `tracing` event of the run to `dir/file_name`. The guard must
/// outlive the event loop or buffered lines are lost.
pub(crate) fn init_file_logging(
    dir: &Path,
    file_name: &str,
    debug: bool,
) -> Result<(PathBuf, WorkerGuard)> {
    fs::create_dir_all(dir).context("create log dir")?;
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install log subscriber: {err}"))?;
    Ok((dir.join(file_name), guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_status_updates_status_and_ring() {
        let mut app = App::for_test();
        app.set_status("Checking server");
        assert_eq!(app.status, "Checking server");
        assert!(app.log_lines.back().unwrap().ends_with("Checking server"));
        assert!(app.log_lines.back().unwrap().contains(LOG_SEPARATOR));
    }

    #[test]
    fn log_ring_is_bounded() {
        let mut app = App::for_test();
        for index in 0..(LOG_MAX_IN_MEMORY + 20) {
            app.set_status(format!("line {index}"));
        }
        assert_eq!(app.log_lines.len(), LOG_MAX_IN_MEMORY);
        let last = app.log_lines.back().unwrap();
        assert!(last.ends_with(&format!("line {}", LOG_MAX_IN_MEMORY + 19)));
    }

    #[test]
    fn debug_lines_need_debug_flag() {
        let mut app = App::for_test();
        let before = app.log_lines.len();
        app.debug_line("noisy detail");
        assert_eq!(app.log_lines.len(), before);

        let mut params = crate::app::tests::params();
        params.flags.debug = true;
        app.params = Some(params);
        app.debug_line("noisy detail");
        assert_eq!(app.log_lines.len(), before + 1);
    }
}
