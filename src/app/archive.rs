use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender, TryRecvError};

use anyhow::Result;

use crate::app::constants::OUTPUT_MAX_BYTES;
use crate::app::helpers::archive_path_for;
use crate::model::{
    BatchOutcome, ComponentEvent, CompressorConfig, ErrorAccumulator, ItemError, JobState,
    StageMessage,
};
use crate::process::{Cancel, ProcessSlot, spawn_in_own_group};

enum ArchiveUpdate {
    Output(String),
    Exited(Result<(), String>),
}

#[derive(Debug, Clone)]
pub(crate) struct ArchiveJob {
    pub(crate) source: PathBuf,
    pub(crate) archive: PathBuf,
    pub(crate) state: JobState,
    pub(crate) output: String,
    truncated: bool,
}

impl ArchiveJob {
    fn push_output(&mut self, line: &str) {
        if self.truncated {
            return;
        }
        if self.output.len() + line.len() + 1 > OUTPUT_MAX_BYTES {
            self.truncated = true;
            self.output.push_str("[output truncated]\n");
            return;
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

/// Runs the compressor once per selected path, one job at a time. The next
/// job starts from `poll`, right after the previous one's exit is seen.
pub(crate) struct ArchiveProducer {
    pub(crate) jobs: Vec<ArchiveJob>,
    compressor: CompressorConfig,
    show_commands: bool,
    slot: ProcessSlot,
    current: Option<(usize, mpsc::Receiver<ArchiveUpdate>)>,
    pending: Vec<ComponentEvent>,
    errors: ErrorAccumulator,
    succeeded: usize,
    finished: bool,
}

impl ArchiveProducer {
    pub(crate) fn run(
        paths: &[PathBuf],
        scratch: &Path,
        compressor: CompressorConfig,
        show_commands: bool,
    ) -> Self {
        let mut taken = HashSet::new();
        let jobs = paths
            .iter()
            .map(|source| ArchiveJob {
                source: source.clone(),
                archive: archive_path_for(source, scratch, &compressor.extension, &mut taken),
                state: JobState::Pending,
                output: String::new(),
                truncated: false,
            })
            .collect();
        let mut producer = Self {
            jobs,
            compressor,
            show_commands,
            slot: ProcessSlot::default(),
            current: None,
            pending: Vec::new(),
            errors: ErrorAccumulator::default(),
            succeeded: 0,
            finished: false,
        };
        producer.start_job(0);
        producer
    }

    pub(crate) fn cancel_handle(&self) -> Arc<dyn Cancel> {
        Arc::new(self.slot.clone())
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// 1-based index of the job in flight, for "Processing item k of N".
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
                    ArchiveUpdate::Exited(Err("archive worker stopped".to_string()))
                }
            };
            match update {
                ArchiveUpdate::Output(line) => {
                    self.jobs[index].push_output(&line);
                    self.pending.push(ComponentEvent::Line(line));
                    self.current = Some((index, rx));
                }
                ArchiveUpdate::Exited(result) => self.finish_job(index, result),
            }
        }
        std::mem::take(&mut self.pending)
    }

    fn finish_job(&mut self, index: usize, result: Result<(), String>) {
        let source = self.jobs[index].source.clone();
        let error = match result {
            Ok(()) => {
                self.jobs[index].state = JobState::Succeeded;
                self.succeeded += 1;
                tracing::info!(source = %source.display(), "archive created");
                None
            }
            Err(message) => {
                self.jobs[index].state = JobState::Failed;
                tracing::warn!(source = %source.display(), error = %message, "archive failed");
                let error = ItemError {
                    item: source.display().to_string(),
                    message,
                };
                self.errors.push(error.clone());
                Some(error)
            }
        };
        self.pending.push(ComponentEvent::Message(StageMessage::ArchiveJobDone {
            index,
            source,
            error,
        }));
        self.start_job(index + 1);
    }

    fn start_job(&mut self, index: usize) {
        let Some(job) = self.jobs.get_mut(index) else {
            self.finished = true;
            let outcome = BatchOutcome::from_accumulator(self.succeeded, self.errors.clone());
            self.pending
                .push(ComponentEvent::Message(StageMessage::ArchiveBatchDone(outcome)));
            return;
        };
        job.state = JobState::Running;
        let (program, args) = expand_command(&self.compressor, &job.source, &job.archive);
        let cwd = job
            .source
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        let command_line = std::iter::once(program.clone())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(command = %command_line, cwd = %cwd.display(), "starting compressor");
        if self.show_commands {
            self.pending.push(ComponentEvent::Line(format!("$ {command_line}")));
        }

        let (tx, rx) = mpsc::channel();
        let slot = self.slot.clone();
        std::thread::spawn(move || {
            let mut command = Command::new(&program);
            command.args(&args).current_dir(&cwd);
            let result = run_compressor(&mut command, &slot, &tx).map_err(|err| format!("{err:#}"));
            let _ = tx.send(ArchiveUpdate::Exited(result));
        });
        self.current = Some((index, rx));
    }
}

fn run_compressor(
    command: &mut Command,
    slot: &ProcessSlot,
    tx: &Sender<ArchiveUpdate>,
) -> Result<()> {
    let mut child = spawn_in_own_group(command)?;
    if !slot.register(child.id()) {
        tracing::debug!(pid = child.id(), "slot closed, compressor killed at start");
    }
    let stdout = child.stdout.take().map(|out| forward_lines(out, tx.clone()));
    let stderr = child.stderr.take().map(|err| forward_lines(err, tx.clone()));
    for reader in [stdout, stderr].into_iter().flatten() {
        let _ = reader.join();
    }
    let status = slot.wait(&mut child)?;
    if !status.success() {
        anyhow::bail!("{:?} failed ({status})", command.get_program());
    }
    Ok(())
}

fn forward_lines<R: Read + Send + 'static>(
    stream: R,
    tx: Sender<ArchiveUpdate>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(ArchiveUpdate::Output(line)).is_err() {
                break;
            }
        }
    })
}

fn expand_command(
    compressor: &CompressorConfig,
    source: &Path,
    archive: &Path,
) -> (String, Vec<String>) {
    let name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    let archive = archive.display().to_string();
    let source = source.display().to_string();
    let args = compressor
        .args
        .iter()
        .map(|arg| {
            arg.replace("{archive}", &archive)
                .replace("{source}", &source)
                .replace("{name}", &name)
        })
        .collect();
    (compressor.program.clone(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::wait_until;
    use std::fs;
    use std::time::{Duration, Instant};

    fn copy_compressor() -> CompressorConfig {
        CompressorConfig {
            program: "cp".to_string(),
            args: vec!["{source}".to_string(), "{archive}".to_string()],
            extension: "bak".to_string(),
        }
    }

    fn shell_compressor(script: &str) -> CompressorConfig {
        CompressorConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            extension: "out".to_string(),
        }
    }

    fn drain(producer: &mut ArchiveProducer) -> (Vec<String>, Vec<StageMessage>) {
        let mut lines = Vec::new();
        let mut messages = Vec::new();
        wait_until(|| {
            for event in producer.poll() {
                match event {
                    ComponentEvent::Line(line) => lines.push(line),
                    ComponentEvent::Message(message) => messages.push(message),
                }
            }
            producer.is_finished()
        });
        (lines, messages)
    }

    #[test]
    fn expand_command_fills_placeholders() {
        let (program, args) = expand_command(
            &CompressorConfig::default(),
            Path::new("/home/pi/photos"),
            Path::new("/tmp/s/photos-backup.zip"),
        );
        assert_eq!(program, "zip");
        assert_eq!(args, vec!["-r", "-9", "/tmp/s/photos-backup.zip", "photos"]);
    }

    #[test]
    fn runs_every_job_in_order_then_reports_batch() {
        let input = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = ["one.txt", "two.txt", "three.txt"]
            .iter()
            .map(|name| {
                let path = input.path().join(name);
                fs::write(&path, name).unwrap();
                path
            })
            .collect();

        let mut producer = ArchiveProducer::run(&paths, scratch.path(), copy_compressor(), true);
        let (lines, messages) = drain(&mut producer);

        assert_eq!(messages.len(), 4);
        for (expected, message) in messages.iter().take(3).enumerate() {
            match message {
                StageMessage::ArchiveJobDone {
                    index,
                    source,
                    error,
                } => {
                    assert_eq!(*index, expected);
                    assert_eq!(source, &paths[expected]);
                    assert!(error.is_none());
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
        match &messages[3] {
            StageMessage::ArchiveBatchDone(outcome) => {
                assert!(outcome.is_success());
                assert_eq!(outcome.succeeded, 3);
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(scratch.path().join("two.txt-backup.bak").is_file());
        assert_eq!(lines.iter().filter(|line| line.starts_with("$ cp")).count(), 3);
        assert!(producer.jobs.iter().all(|job| job.state == JobState::Succeeded));
    }

    #[test]
    fn failing_job_is_recorded_and_batch_continues() {
        let input = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let first = input.path().join("a.txt");
        let missing = input.path().join("missing.txt");
        let third = input.path().join("c.txt");
        fs::write(&first, "a").unwrap();
        fs::write(&third, "c").unwrap();
        let paths = vec![first, missing.clone(), third];

        let mut producer = ArchiveProducer::run(&paths, scratch.path(), copy_compressor(), false);
        let (_, messages) = drain(&mut producer);

        let outcome = match messages.last() {
            Some(StageMessage::ArchiveBatchDone(outcome)) => outcome.clone(),
            other => panic!("unexpected message {other:?}"),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].item, missing.display().to_string());
        assert_eq!(producer.jobs[0].state, JobState::Succeeded);
        assert_eq!(producer.jobs[1].state, JobState::Failed);
        assert_eq!(producer.jobs[2].state, JobState::Succeeded);
        assert!(!producer.jobs[1].output.is_empty());
        assert_eq!(producer.failures(), 1);
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = vec![scratch.path().join("src")];
        let compressor = shell_compressor("echo to-stdout; echo to-stderr >&2");
        let mut producer = ArchiveProducer::run(&paths, scratch.path(), compressor, false);
        let (lines, _) = drain(&mut producer);
        assert!(lines.contains(&"to-stdout".to_string()));
        assert!(lines.contains(&"to-stderr".to_string()));
        assert!(producer.jobs[0].output.contains("to-stderr"));
    }

    #[test]
    fn spawn_failure_becomes_item_error() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = vec![scratch.path().join("src")];
        let compressor = CompressorConfig {
            program: "definitely-not-a-compressor-xyz".to_string(),
            args: Vec::new(),
            extension: "zip".to_string(),
        };
        let mut producer = ArchiveProducer::run(&paths, scratch.path(), compressor, false);
        let (_, messages) = drain(&mut producer);
        match messages.last() {
            Some(StageMessage::ArchiveBatchDone(outcome)) => {
                assert_eq!(outcome.errors.len(), 1);
                assert!(outcome.errors[0].message.contains("definitely-not-a-compressor-xyz"));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn kill_stops_running_job() {
        let scratch = tempfile::tempdir().unwrap();
        let paths = vec![scratch.path().join("slow")];
        let mut producer =
            ArchiveProducer::run(&paths, scratch.path(), shell_compressor("sleep 30"), false);
        wait_until(|| producer.slot.current().is_some());
        let started = Instant::now();
        assert!(producer.slot.kill());
        let (_, messages) = drain(&mut producer);
        assert!(started.elapsed() < Duration::from_secs(10));
        match messages.last() {
            Some(StageMessage::ArchiveBatchDone(outcome)) => assert_eq!(outcome.errors.len(), 1),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn empty_selection_finishes_immediately() {
        let scratch = tempfile::tempdir().unwrap();
        let mut producer = ArchiveProducer::run(&[], scratch.path(), copy_compressor(), false);
        let events = producer.poll();
        assert!(producer.is_finished());
        assert!(!producer.slot.kill());
        assert!(!producer.slot.is_closed());
        assert!(matches!(
            events.as_slice(),
            [ComponentEvent::Message(StageMessage::ArchiveBatchDone(_))]
        ));
    }
}
