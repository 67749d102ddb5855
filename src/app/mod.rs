use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::archive::ArchiveProducer;
use crate::app::browser::FileBrowser;
use crate::app::constants::STATUS_READY;
use crate::app::probe::ConnectivityProber;
use crate::app::ssh_backend::SshBackend;
use crate::app::upload::UploadDispatcher;
use crate::model::{BatchOutcome, ParamsFormState, SessionParams, Settings, Stage};
use crate::process::Cancel;
use crate::scratch::ScratchDir;

pub(crate) mod archive;
pub(crate) mod browser;
pub(crate) mod constants;
mod form;
mod handlers;
pub(crate) mod helpers;
pub(crate) mod logging;
pub(crate) mod probe;
pub(crate) mod ssh_backend;
mod stages;
pub(crate) mod upload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderMode {
    Help,
    Logs,
    Off,
}

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    NothingSelected,
    Completed,
    Interrupted,
}

pub(crate) struct App {
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) settings: Settings,
    pub(crate) log_path: PathBuf,
    pub(crate) log_lines: VecDeque<String>,
    pub(crate) status: String,
    pub(crate) stage: Stage,
    pub(crate) form: ParamsFormState,
    pub(crate) params: Option<SessionParams>,
    pub(crate) prober: Option<ConnectivityProber>,
    pub(crate) browser: Option<FileBrowser>,
    pub(crate) archiver: Option<ArchiveProducer>,
    pub(crate) uploader: Option<UploadDispatcher>,
    pub(crate) archive_outcome: Option<BatchOutcome>,
    pub(crate) upload_outcome: Option<BatchOutcome>,
    pub(crate) scratch: ScratchDir,
    pub(crate) exit: Option<SessionEnd>,
    pub(crate) header_mode: HeaderMode,
    active_cancel: Option<Arc<dyn Cancel>>,
    torn_down: bool,
    ssh_backend: Arc<dyn SshBackend>,
}

impl App {
    pub(crate) fn new(
        scratch: ScratchDir,
        settings: Settings,
        config_path: Option<PathBuf>,
        log_path: PathBuf,
        ssh_backend: Arc<dyn SshBackend>,
    ) -> Self {
        let mut app = Self {
            config_path,
            settings,
            log_path,
            log_lines: VecDeque::new(),
            status: STATUS_READY.to_string(),
            stage: Stage::Input,
            form: ParamsFormState::default(),
            params: None,
            prober: None,
            browser: None,
            archiver: None,
            uploader: None,
            archive_outcome: None,
            upload_outcome: None,
            scratch,
            exit: None,
            header_mode: HeaderMode::Help,
            active_cancel: None,
            torn_down: false,
            ssh_backend,
        };
        app.reset_form();
        app.set_status(STATUS_READY);
        app
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::for_test_with_backend(Arc::new(ssh_backend::MockSshBackend::default()))
    }

    #[cfg(test)]
    pub(crate) fn for_test_with_backend(backend: Arc<dyn SshBackend>) -> Self {
        let scratch = ScratchDir::create().unwrap();
        Self::new(
            scratch,
            Settings::default(),
            None,
            PathBuf::from("test.log"),
            backend,
        )
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.teardown();
    }
}
