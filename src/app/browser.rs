use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::app::helpers::read_dir_entries;
use crate::model::{FileEntry, StageMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BrowserMode {
    Browsing,
    PickAnother,
}

/// Directory browser with a type-to-filter query. The view is rebuilt from
/// the full listing on every query change; nothing touches the disk for it.
#[derive(Debug)]
pub(crate) struct FileBrowser {
    pub(crate) cwd: PathBuf,
    entries: Vec<FileEntry>,
    pub(crate) view: Vec<FileEntry>,
    pub(crate) query: String,
    pub(crate) selected: usize,
    pub(crate) selection: Vec<PathBuf>,
    pub(crate) mode: BrowserMode,
    pub(crate) feedback: Option<String>,
    hidden: PathBuf,
}

impl FileBrowser {
    pub(crate) fn new(start: PathBuf, hidden: &Path) -> Self {
        let mut browser = Self {
            cwd: start.clone(),
            entries: Vec::new(),
            view: Vec::new(),
            query: String::new(),
            selected: 0,
            selection: Vec::new(),
            mode: BrowserMode::Browsing,
            feedback: None,
            hidden: hidden.to_path_buf(),
        };
        if let Err(err) = browser.load_dir(start) {
            browser.feedback = Some(format!("{err:#}"));
        }
        browser
    }

    pub(crate) fn load_dir(&mut self, dir: PathBuf) -> Result<()> {
        let entries = read_dir_entries(&dir, &self.hidden)?;
        tracing::debug!(dir = %dir.display(), count = entries.len(), "listing directory");
        self.cwd = dir;
        self.entries = entries;
        self.query.clear();
        self.filter("");
        Ok(())
    }

    /// Keeps the entries whose lower-cased name contains the lower-cased
    /// query. An empty query shows everything.
    pub(crate) fn filter(&mut self, query: &str) {
        self.query = query.to_string();
        let needle = query.to_lowercase();
        self.view.clear();
        self.view.extend(
            self.entries
                .iter()
                .filter(|entry| needle.is_empty() || matches_query(entry, &needle))
                .cloned(),
        );
        self.selected = 0;
    }

    pub(crate) fn push_query(&mut self, ch: char) {
        let mut query = self.query.clone();
        query.push(ch);
        self.filter(&query);
    }

    pub(crate) fn pop_query(&mut self) {
        let mut query = self.query.clone();
        query.pop();
        self.filter(&query);
    }

    pub(crate) fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub(crate) fn move_down(&mut self) {
        if self.selected + 1 < self.view.len() {
            self.selected += 1;
        }
    }

    pub(crate) fn highlighted(&self) -> Option<&FileEntry> {
        self.view.get(self.selected)
    }

    pub(crate) fn open_highlighted(&mut self) {
        let Some(entry) = self.highlighted().filter(|entry| entry.is_dir).cloned() else {
            return;
        };
        self.open(entry.path);
    }

    pub(crate) fn parent(&mut self) {
        let Some(parent) = self.cwd.parent().map(Path::to_path_buf) else {
            return;
        };
        let previous = self.cwd.clone();
        self.open(parent);
        if let Some(index) = self.view.iter().position(|entry| entry.path == previous) {
            self.selected = index;
        }
    }

    /// Enter: directories open, files are selected.
    pub(crate) fn activate(&mut self) {
        let Some(entry) = self.highlighted().cloned() else {
            return;
        };
        if entry.is_dir {
            self.open(entry.path);
        } else {
            self.select(entry.path);
        }
    }

    /// Selects the highlighted entry whether it is a file or a directory.
    pub(crate) fn select_highlighted(&mut self) {
        if let Some(entry) = self.highlighted().cloned() {
            self.select(entry.path);
        }
    }

    pub(crate) fn select(&mut self, path: PathBuf) -> bool {
        if self.selection.contains(&path) {
            self.feedback = Some(format!("{} is already selected", path.display()));
            return false;
        }
        tracing::info!(path = %path.display(), "selected for backup");
        self.selection.push(path);
        self.feedback = None;
        self.mode = BrowserMode::PickAnother;
        true
    }

    /// Answers "pick another?". Yes goes back to browsing with the query
    /// cleared, no finishes the selection.
    pub(crate) fn answer_prompt(&mut self, another: bool) -> Option<StageMessage> {
        if self.mode != BrowserMode::PickAnother {
            return None;
        }
        if another {
            self.mode = BrowserMode::Browsing;
            self.filter("");
            return None;
        }
        Some(self.finish())
    }

    pub(crate) fn finish(&mut self) -> StageMessage {
        self.mode = BrowserMode::Browsing;
        StageMessage::SelectionDone(self.selection.clone())
    }

    fn open(&mut self, dir: PathBuf) {
        match self.load_dir(dir.clone()) {
            Ok(()) => self.feedback = None,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %format!("{err:#}"), "cannot open");
                self.feedback = Some(format!("{}: {err:#}", dir.display()));
            }
        }
    }
}

fn matches_query(entry: &FileEntry, needle: &str) -> bool {
    if entry.name.to_lowercase().contains(needle) {
        return true;
    }
    Path::new(&entry.name)
        .extension()
        .is_some_and(|ext| ext.to_string_lossy().to_lowercase().contains(needle))
}
