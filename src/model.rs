use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct SessionParams {
    pub(crate) user: String,
    pub(crate) host: String,
    pub(crate) secret: String,
    pub(crate) flags: SessionFlags,
}

impl SessionParams {
    pub(crate) fn label(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("secret", &"***")
            .field("flags", &self.flags)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionFlags {
    pub(crate) debug: bool,
    pub(crate) show_commands: bool,
    pub(crate) show_progress: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            debug: false,
            show_commands: true,
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    Input,
    Check,
    Files,
    Create,
    Upload,
    Delete,
}

impl Stage {
    pub(crate) const ALL: [Stage; 6] = [
        Stage::Input,
        Stage::Check,
        Stage::Files,
        Stage::Create,
        Stage::Upload,
        Stage::Delete,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Stage::Input => "Input",
            Stage::Check => "Check",
            Stage::Files => "Files",
            Stage::Create => "Create",
            Stage::Upload => "Upload",
            Stage::Delete => "Cleanup",
        }
    }
}

/// One failed item of a batch, kept with the identity it was reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemError {
    pub(crate) item: String,
    pub(crate) message: String,
}

impl ItemError {
    pub(crate) fn new(item: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            item: item.into(),
            message: format!("{err:#}"),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.message)
    }
}

/// Append-only list of failures collected while a batch runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ErrorAccumulator {
    entries: Vec<ItemError>,
}

impl ErrorAccumulator {
    pub(crate) fn push(&mut self, error: ItemError) {
        self.entries.push(error);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_vec(self) -> Vec<ItemError> {
        self.entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BatchOutcome {
    pub(crate) succeeded: usize,
    pub(crate) errors: Vec<ItemError>,
}

impl BatchOutcome {
    pub(crate) fn from_accumulator(succeeded: usize, errors: ErrorAccumulator) -> Self {
        Self {
            succeeded,
            errors: errors.into_vec(),
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn summary(&self) -> String {
        if self.is_success() {
            format!("{} succeeded", self.succeeded)
        } else {
            format!("finished with {} errors", self.errors.len())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub(crate) enum StageMessage {
    InputDone(SessionParams),
    ConnectivityResult(Result<(), String>),
    SelectionDone(Vec<PathBuf>),
    ArchiveJobDone {
        index: usize,
        source: PathBuf,
        error: Option<ItemError>,
    },
    ArchiveBatchDone(BatchOutcome),
    UploadJobDone {
        index: usize,
        name: String,
        error: Option<ItemError>,
    },
    UploadBatchDone(BatchOutcome),
    Interrupt,
}

/// What a batch component hands the controller on each poll: log lines for
/// the panel, or a message that drives the stage machine.
#[derive(Debug)]
pub(crate) enum ComponentEvent {
    Line(String),
    Message(StageMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    User,
    Host,
    Password,
    Debug,
    ShowCommands,
    ShowProgress,
    ActionStart,
}

impl Field {
    pub(crate) const ORDER: [Field; 7] = [
        Field::User,
        Field::Host,
        Field::Password,
        Field::Debug,
        Field::ShowCommands,
        Field::ShowProgress,
        Field::ActionStart,
    ];

    pub(crate) fn is_text(self) -> bool {
        matches!(self, Field::User | Field::Host | Field::Password)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ParamsFormState {
    pub(crate) user: String,
    pub(crate) host: String,
    pub(crate) password: String,
    pub(crate) flags: SessionFlags,
    pub(crate) active_field: Field,
    pub(crate) feedback: Option<String>,
}

impl Default for ParamsFormState {
    fn default() -> Self {
        Self {
            user: String::new(),
            host: String::new(),
            password: String::new(),
            flags: SessionFlags::default(),
            active_field: Field::User,
            feedback: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileEntry {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) is_dir: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct CompressorConfig {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) extension: String,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            program: "zip".to_string(),
            args: vec![
                "-r".to_string(),
                "-9".to_string(),
                "{archive}".to_string(),
                "{name}".to_string(),
            ],
            extension: "zip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Settings {
    #[serde(default)]
    pub(crate) last_user: Option<String>,
    #[serde(default)]
    pub(crate) last_host: Option<String>,
    #[serde(default)]
    pub(crate) last_browse_dir: Option<String>,
    #[serde(default)]
    pub(crate) compressor: CompressorConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SessionParams {
        SessionParams {
            user: "pi".to_string(),
            host: "raspberrypi".to_string(),
            secret: "hunter2".to_string(),
            flags: SessionFlags::default(),
        }
    }

    #[test]
    fn debug_output_masks_secret() {
        let rendered = format!("{:?}", params());
        assert!(rendered.contains("raspberrypi"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn flags_default_to_commands_and_progress() {
        let flags = SessionFlags::default();
        assert!(!flags.debug);
        assert!(flags.show_commands);
        assert!(flags.show_progress);
    }

    #[test]
    fn stages_are_ordered() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert!(Stage::Check < Stage::Files);
    }

    #[test]
    fn batch_outcome_summary_counts_errors() {
        let mut errors = ErrorAccumulator::default();
        let ok = BatchOutcome::from_accumulator(3, errors.clone());
        assert!(ok.is_success());
        assert_eq!(ok.summary(), "3 succeeded");

        errors.push(ItemError::new("/a", &anyhow::anyhow!("boom")));
        errors.push(ItemError::new("/b", &anyhow::anyhow!("bang")));
        assert_eq!(errors.len(), 2);
        let failed = BatchOutcome::from_accumulator(1, errors);
        assert!(!failed.is_success());
        assert_eq!(failed.summary(), "finished with 2 errors");
    }

    #[test]
    fn item_error_keeps_context_chain() {
        let err = anyhow::anyhow!("permission denied").context("open local file");
        let item = ItemError::new("a.zip", &err);
        assert_eq!(item.message, "open local file: permission denied");
        assert_eq!(item.to_string(), "a.zip: open local file: permission denied");
    }

    #[test]
    fn settings_tolerate_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{ "last_user": "pi" }"#).unwrap();
        assert_eq!(settings.last_user.as_deref(), Some("pi"));
        assert_eq!(settings.compressor, CompressorConfig::default());
    }
}
