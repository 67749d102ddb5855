use crate::app::archive::ArchiveProducer;
use crate::app::browser::FileBrowser;
use crate::app::constants::STATUS_INTERRUPTED;
use crate::app::helpers::resolve_browse_start;
use crate::app::probe::ConnectivityProber;
use crate::app::upload::UploadDispatcher;
use crate::app::{App, SessionEnd};
use crate::model::{ComponentEvent, Stage, StageMessage};
use crate::storage::save_settings;

impl App {
    /// Applies one message to the stage machine. Messages that do not belong
    /// to the current stage are dropped.
    pub(crate) fn dispatch(&mut self, message: StageMessage) {
        if self.torn_down && !matches!(message, StageMessage::Interrupt) {
            tracing::debug!(?message, "message after teardown ignored");
            return;
        }
        match (self.stage, message) {
            (_, StageMessage::Interrupt) => self.interrupt(),
            (Stage::Input, StageMessage::InputDone(params)) => {
                self.set_status(format!("Checking {}", params.label()));
                self.prober = Some(ConnectivityProber::start(
                    params.clone(),
                    self.ssh_backend.clone(),
                ));
                self.params = Some(params);
                self.stage = Stage::Check;
            }
            (Stage::Check, StageMessage::ConnectivityResult(Ok(()))) => self.enter_files(),
            (Stage::Check, StageMessage::ConnectivityResult(Err(err))) => {
                self.set_status(format!("Connection failed: {err}"));
            }
            (Stage::Files, StageMessage::SelectionDone(paths)) => {
                if let Some(browser) = &self.browser {
                    self.settings.last_browse_dir = Some(browser.cwd.display().to_string());
                }
                self.persist_settings();
                self.browser = None;
                if paths.is_empty() {
                    self.set_status("Nothing selected, nothing to do");
                    self.end_session(SessionEnd::NothingSelected);
                    return;
                }
                self.enter_create(paths);
            }
            (Stage::Create, StageMessage::ArchiveJobDone { index, source, error }) => {
                tracing::debug!(index, ok = error.is_none(), "archive job done");
                match error {
                    None => self.set_status(format!("Archived {}", source.display())),
                    Some(error) => self.set_status(format!("Archive failed: {error}")),
                }
            }
            (Stage::Create, StageMessage::ArchiveBatchDone(outcome)) => {
                self.set_status(format!("Archives: {}", outcome.summary()));
                self.archive_outcome = Some(outcome);
                self.enter_upload();
            }
            (Stage::Upload, StageMessage::UploadJobDone { index, name, error }) => {
                tracing::debug!(index, ok = error.is_none(), "upload job done");
                match error {
                    None => self.set_status(format!("Uploaded {name}")),
                    Some(error) => self.set_status(format!("Upload failed: {error}")),
                }
            }
            (Stage::Upload, StageMessage::UploadBatchDone(outcome)) => {
                self.set_status(format!("Uploads: {}", outcome.summary()));
                self.upload_outcome = Some(outcome);
                self.uploader = None;
                self.active_cancel = None;
                self.stage = Stage::Delete;
                self.teardown();
                self.set_status("Done, press any key to exit");
            }
            (stage, message) => {
                self.debug_line(format!("Ignored {message:?} in {}", stage.label()));
            }
        }
    }

    pub(crate) fn retry_probe(&mut self) {
        let Some(prober) = self.prober.as_mut() else {
            return;
        };
        if prober.retry() {
            let attempt = prober.attempts;
            let host = prober.host().to_string();
            self.set_status(format!("Checking {host} (attempt {attempt})"));
        }
    }

    /// Drops the collected params and returns to a fresh form.
    pub(crate) fn edit_params(&mut self) {
        self.params = None;
        self.prober = None;
        self.reset_form();
        self.stage = Stage::Input;
        self.set_status("Edit the server details");
    }

    /// Drains every running component once. Called on each loop tick.
    pub(crate) fn poll_components(&mut self) {
        if let Some(message) = self.prober.as_mut().and_then(|prober| prober.poll()) {
            self.dispatch(message);
        }
        let archive_events = self
            .archiver
            .as_mut()
            .map(ArchiveProducer::poll)
            .unwrap_or_default();
        self.handle_component_events(archive_events);
        let upload_events = self
            .uploader
            .as_mut()
            .map(UploadDispatcher::poll)
            .unwrap_or_default();
        self.handle_component_events(upload_events);
    }

    /// Cancels the active component and removes the scratch dir. Only the
    /// first call does anything.
    pub(crate) fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(cancel) = self.active_cancel.take() {
            if cancel.cancel() {
                tracing::info!(stage = self.stage.label(), "cancelled running job");
            }
        }
        match self.scratch.remove() {
            Ok(true) => tracing::info!(path = %self.scratch.path().display(), "scratch removed"),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %format!("{err:#}"), "scratch cleanup failed"),
        }
    }

    pub(crate) fn interrupt(&mut self) {
        if self.exit.is_some() {
            return;
        }
        if self.stage == Stage::Delete {
            self.end_session(SessionEnd::Completed);
            return;
        }
        self.set_status(STATUS_INTERRUPTED);
        self.end_session(SessionEnd::Interrupted);
    }

    pub(crate) fn end_session(&mut self, reason: SessionEnd) {
        self.teardown();
        tracing::info!(?reason, "session ended");
        self.exit = Some(reason);
    }

    /// Lines printed after the terminal is restored.
    pub(crate) fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.exit {
            Some(SessionEnd::NothingSelected) => {
                lines.push("Nothing selected, nothing to do.".to_string());
            }
            Some(SessionEnd::Interrupted) => lines.push("Interrupted.".to_string()),
            Some(SessionEnd::Completed) | None => {}
        }
        for (label, outcome) in [
            ("Archives", &self.archive_outcome),
            ("Uploads", &self.upload_outcome),
        ] {
            let Some(outcome) = outcome else {
                continue;
            };
            lines.push(format!("{label}: {}", outcome.summary()));
            lines.extend(outcome.errors.iter().map(|error| format!("  {error}")));
        }
        lines
    }

    fn enter_files(&mut self) {
        if let Some(params) = &self.params {
            self.settings.last_user = Some(params.user.clone());
            self.settings.last_host = Some(params.host.clone());
        }
        self.persist_settings();
        let start = resolve_browse_start(self.settings.last_browse_dir.as_deref());
        self.browser = Some(FileBrowser::new(start, self.scratch.path()));
        self.stage = Stage::Files;
        self.set_status("Connected, pick what to back up");
    }

    fn enter_create(&mut self, paths: Vec<std::path::PathBuf>) {
        let show_commands = self
            .params
            .as_ref()
            .is_some_and(|params| params.flags.show_commands);
        let archiver = ArchiveProducer::run(
            &paths,
            self.scratch.path(),
            self.settings.compressor.clone(),
            show_commands,
        );
        self.active_cancel = Some(archiver.cancel_handle());
        self.archiver = Some(archiver);
        self.stage = Stage::Create;
        self.set_status(format!("Creating {} archives", paths.len()));
    }

    fn enter_upload(&mut self) {
        self.archiver = None;
        self.active_cancel = None;
        self.stage = Stage::Upload;
        let Some(params) = self.params.clone() else {
            self.set_status("Session parameters missing, skipping upload");
            self.end_session(SessionEnd::Interrupted);
            return;
        };
        let uploader =
            UploadDispatcher::run(self.scratch.path(), params, self.ssh_backend.clone());
        self.active_cancel = Some(uploader.cancel_handle());
        self.uploader = Some(uploader);
        self.set_status("Uploading archives");
    }

    fn handle_component_events(&mut self, events: Vec<ComponentEvent>) {
        for event in events {
            match event {
                ComponentEvent::Line(line) => self.log_line(&line),
                ComponentEvent::Message(message) => self.dispatch(message),
            }
        }
    }

    fn persist_settings(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        if let Err(err) = save_settings(&path, &self.settings) {
            self.set_status(format!("Failed to save settings: {err:#}"));
        }
    }
}
