use std::sync::Arc;
use std::sync::mpsc::{self, TryRecvError};

use crate::app::ssh_backend::SshBackend;
use crate::model::{SessionParams, StageMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeState {
    Running,
    Connected,
    Failed(String),
}

/// Checks that the host accepts the session credentials. Each attempt runs on
/// its own worker and reports exactly one `ConnectivityResult`.
pub(crate) struct ConnectivityProber {
    params: SessionParams,
    backend: Arc<dyn SshBackend>,
    pub(crate) attempts: u32,
    pub(crate) state: ProbeState,
    rx: Option<mpsc::Receiver<Result<(), String>>>,
}

impl ConnectivityProber {
    pub(crate) fn start(params: SessionParams, backend: Arc<dyn SshBackend>) -> Self {
        let mut prober = Self {
            params,
            backend,
            attempts: 1,
            state: ProbeState::Running,
            rx: None,
        };
        prober.spawn();
        prober
    }

    pub(crate) fn host(&self) -> &str {
        &self.params.host
    }

    /// Re-runs the probe with the same parameters. Ignored unless the last
    /// attempt failed.
    pub(crate) fn retry(&mut self) -> bool {
        if !matches!(self.state, ProbeState::Failed(_)) {
            return false;
        }
        self.attempts += 1;
        self.spawn();
        true
    }

    pub(crate) fn poll(&mut self) -> Option<StageMessage> {
        let rx = self.rx.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err("probe worker stopped".to_string()),
        };
        self.rx = None;
        self.state = match &result {
            Ok(()) => ProbeState::Connected,
            Err(err) => ProbeState::Failed(err.clone()),
        };
        Some(StageMessage::ConnectivityResult(result))
    }

    fn spawn(&mut self) {
        self.state = ProbeState::Running;
        let (tx, rx) = mpsc::channel();
        let params = self.params.clone();
        let backend = self.backend.clone();
        let attempt = self.attempts;
        std::thread::spawn(move || {
            tracing::info!(host = %params.host, attempt, "checking server");
            let result = backend.probe(&params).map_err(|err| format!("{err:#}"));
            match &result {
                Ok(()) => tracing::info!(host = %params.host, "connection success"),
                Err(err) => tracing::warn!(host = %params.host, error = %err, "connection failed"),
            }
            let _ = tx.send(result);
        });
        self.rx = Some(rx);
    }
}
