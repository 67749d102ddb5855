use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};

use crate::app::constants::{NOTHING_TO_UPLOAD, PROGRESS_LOG_STEP_BYTES};
use crate::app::helpers::list_files;
use crate::app::ssh_backend::SshBackend;
use crate::model::{
    BatchOutcome, ComponentEvent, ErrorAccumulator, ItemError, JobState, SessionParams,
    StageMessage,
};
use crate::process::Cancel;
use crate::ui::helpers::format_bytes;

enum UploadUpdate {
    Bytes(u64),
    Done(Result<u64, String>),
}

#[derive(Debug, Clone)]
pub(crate) struct UploadJob {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) state: JobState,
    pub(crate) bytes: u64,
    logged_bytes: u64,
}

struct CancelFlag(Arc<AtomicBool>);

impl Cancel for CancelFlag {
    fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// Pushes every archive in the scratch dir to the server, one SSH session
/// per file, strictly in name order.
pub(crate) struct UploadDispatcher {
    pub(crate) jobs: Vec<UploadJob>,
    params: SessionParams,
    backend: Arc<dyn SshBackend>,
    cancel: Arc<AtomicBool>,
    current: Option<(usize, mpsc::Receiver<UploadUpdate>)>,
    pending: Vec<ComponentEvent>,
    errors: ErrorAccumulator,
    succeeded: usize,
    finished: bool,
}

impl UploadDispatcher {
    pub(crate) fn run(scratch: &Path, params: SessionParams, backend: Arc<dyn SshBackend>) -> Self {
        let mut dispatcher = Self {
            jobs: Vec::new(),
            params,
            backend,
            cancel: Arc::new(AtomicBool::new(false)),
            current: None,
            pending: Vec::new(),
            errors: ErrorAccumulator::default(),
            succeeded: 0,
            finished: false,
        };
        let batch_error = match list_files(scratch) {
            Ok(files) if files.is_empty() => Some(anyhow::anyhow!(NOTHING_TO_UPLOAD)),
            Ok(files) => {
                dispatcher.jobs = files
                    .into_iter()
                    .map(|path| UploadJob {
                        name: path
                            .file_name()
                            .map(|name| name.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        path,
                        state: JobState::Pending,
                        bytes: 0,
                        logged_bytes: 0,
                    })
                    .collect();
                None
            }
            Err(err) => Some(err),
        };
        if let Some(err) = batch_error {
            let error = ItemError::new(scratch.display().to_string(), &err);
            tracing::warn!(scratch = %scratch.display(), error = %error.message, "upload batch failed");
            dispatcher.errors.push(error);
            dispatcher.finish_batch();
            return dispatcher;
        }
        dispatcher.start_job(0);
        dispatcher
    }

    pub(crate) fn cancel_handle(&self) -> Arc<dyn Cancel> {
        Arc::new(CancelFlag(self.cancel.clone()))
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn progress(&self) -> (usize, usize) {
        let index = self
            .current
            .as_ref()
            .map(|(index, _)| *index + 1)
            .unwrap_or(self.jobs.len());
        (index, self.jobs.len())
    }

    pub(crate) fn failures(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn poll(&mut self) -> Vec<ComponentEvent> {
        while let Some((index, rx)) = self.current.take() {
            let update = match rx.try_recv() {
                Ok(update) => update,
                Err(TryRecvError::Empty) => {
                    self.current = Some((index, rx));
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    UploadUpdate::Done(Err("upload worker stopped".to_string()))
                }
            };
            match update {
                UploadUpdate::Bytes(amount) => {
                    self.record_bytes(index, amount);
                    self.current = Some((index, rx));
                }
                UploadUpdate::Done(result) => self.finish_job(index, result),
            }
        }
        std::mem::take(&mut self.pending)
    }

    fn record_bytes(&mut self, index: usize, amount: u64) {
        let show_progress = self.params.flags.show_progress;
        let job = &mut self.jobs[index];
        job.bytes = job.bytes.saturating_add(amount);
        if show_progress && job.bytes.saturating_sub(job.logged_bytes) >= PROGRESS_LOG_STEP_BYTES {
            job.logged_bytes = job.bytes;
            let line = format!("{}: {} sent", job.name, format_bytes(job.bytes));
            self.pending.push(ComponentEvent::Line(line));
        }
    }

    fn finish_job(&mut self, index: usize, result: Result<u64, String>) {
        let name = self.jobs[index].name.clone();
        let error = match result {
            Ok(total) => {
                self.jobs[index].state = JobState::Succeeded;
                self.succeeded += 1;
                tracing::info!(file = %name, bytes = total, "upload finished");
                if self.params.flags.show_progress {
                    let line = format!("{name}: {} uploaded", format_bytes(total));
                    self.pending.push(ComponentEvent::Line(line));
                }
                None
            }
            Err(message) => {
                self.jobs[index].state = JobState::Failed;
                tracing::warn!(file = %name, error = %message, "upload failed");
                let error = ItemError {
                    item: name.clone(),
                    message,
                };
                self.errors.push(error.clone());
                Some(error)
            }
        };
        self.pending.push(ComponentEvent::Message(StageMessage::UploadJobDone {
            index,
            name,
            error,
        }));
        self.start_job(index + 1);
    }

    fn start_job(&mut self, index: usize) {
        if self.cancel.load(Ordering::SeqCst) {
            tracing::info!(remaining = self.jobs.len().saturating_sub(index), "uploads cancelled");
            self.finish_batch();
            return;
        }
        let Some(job) = self.jobs.get_mut(index) else {
            self.finish_batch();
            return;
        };
        job.state = JobState::Running;
        let path = job.path.clone();
        let params = self.params.clone();
        let backend = self.backend.clone();
        let cancel = self.cancel.clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            tracing::info!(file = %path.display(), host = %params.host, "uploading");
            let progress_tx = tx.clone();
            let mut on_bytes = move |amount: u64| {
                let _ = progress_tx.send(UploadUpdate::Bytes(amount));
            };
            let result = backend
                .upload_file(&params, &path, &cancel, &mut on_bytes)
                .map_err(|err| format!("{err:#}"));
            let _ = tx.send(UploadUpdate::Done(result));
        });
        self.current = Some((index, rx));
    }

    fn finish_batch(&mut self) {
        self.finished = true;
        let outcome = BatchOutcome::from_accumulator(self.succeeded, self.errors.clone());
        self.pending
            .push(ComponentEvent::Message(StageMessage::UploadBatchDone(outcome)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ssh_backend::MockSshBackend;
    use crate::app::tests::{params, wait_until};
    use std::fs;

    fn drain(dispatcher: &mut UploadDispatcher) -> (Vec<String>, Vec<StageMessage>) {
        let mut lines = Vec::new();
        let mut messages = Vec::new();
        wait_until(|| {
            for event in dispatcher.poll() {
                match event {
                    ComponentEvent::Line(line) => lines.push(line),
                    ComponentEvent::Message(message) => messages.push(message),
                }
            }
            dispatcher.is_finished()
        });
        (lines, messages)
    }

    #[test]
    fn empty_scratch_is_a_single_batch_error() {
        let scratch = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockSshBackend::default());
        let mut dispatcher = UploadDispatcher::run(scratch.path(), params(), backend.clone());
        let (_, messages) = drain(&mut dispatcher);

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            StageMessage::UploadBatchDone(outcome) => {
                assert_eq!(outcome.errors.len(), 1);
                assert_eq!(outcome.errors[0].message, NOTHING_TO_UPLOAD);
                assert_eq!(outcome.errors[0].item, scratch.path().display().to_string());
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(backend.uploads().is_empty());
    }

    #[test]
    fn unreadable_scratch_is_a_single_batch_error() {
        let scratch = tempfile::tempdir().unwrap();
        let missing = scratch.path().join("gone");
        let backend = Arc::new(MockSshBackend::default());
        let mut dispatcher = UploadDispatcher::run(&missing, params(), backend);
        let (_, messages) = drain(&mut dispatcher);
        match messages.as_slice() {
            [StageMessage::UploadBatchDone(outcome)] => {
                assert_eq!(outcome.errors.len(), 1);
                assert!(outcome.errors[0].message.starts_with("read scratch dir"));
            }
            other => panic!("unexpected messages {other:?}"),
        }
    }

    #[test]
    fn uploads_in_name_order_and_continues_past_failures() {
        let scratch = tempfile::tempdir().unwrap();
        for name in ["c-backup.zip", "a-backup.zip", "b-backup.zip"] {
            fs::write(scratch.path().join(name), name).unwrap();
        }
        fs::create_dir(scratch.path().join("nested")).unwrap();
        let backend = Arc::new(MockSshBackend::default());
        backend.fail_upload("b-backup.zip");

        let mut dispatcher = UploadDispatcher::run(scratch.path(), params(), backend.clone());
        let (lines, messages) = drain(&mut dispatcher);

        assert_eq!(
            backend.uploads(),
            vec!["a-backup.zip", "b-backup.zip", "c-backup.zip"]
        );
        assert_eq!(messages.len(), 4);
        match &messages[1] {
            StageMessage::UploadJobDone { index, name, error } => {
                assert_eq!(*index, 1);
                assert_eq!(name, "b-backup.zip");
                assert!(error.as_ref().unwrap().message.contains("permission denied"));
            }
            other => panic!("unexpected message {other:?}"),
        }
        match &messages[3] {
            StageMessage::UploadBatchDone(outcome) => {
                assert_eq!(outcome.succeeded, 2);
                assert_eq!(outcome.errors.len(), 1);
                assert_eq!(outcome.errors[0].item, "b-backup.zip");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(lines.iter().any(|line| line.starts_with("a-backup.zip: ")));
        assert_eq!(dispatcher.jobs[2].state, JobState::Succeeded);
    }

    #[test]
    fn cancel_handle_sets_flag_once() {
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher =
            UploadDispatcher::run(scratch.path(), params(), Arc::new(MockSshBackend::default()));
        let handle = dispatcher.cancel_handle();
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(dispatcher.cancel.load(Ordering::SeqCst));
    }
}
