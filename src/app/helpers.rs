use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::app::constants::ARCHIVE_SUFFIX;
use crate::model::FileEntry;

pub(crate) fn resolve_browse_start(last: Option<&str>) -> PathBuf {
    if let Some(last) = last.filter(|value| !value.trim().is_empty()) {
        let path = PathBuf::from(last);
        if path.is_dir() {
            return path;
        }
    }
    if let Some(home) = dirs::home_dir() {
        return home;
    }
    PathBuf::from("/")
}

/// Lists `dir` sorted case-insensitively, leaving out `hidden` (the scratch
/// directory must never be offered as a backup source).
pub(crate) fn read_dir_entries(dir: &Path, hidden: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).context("read dir")? {
        let entry = entry.context("read dir entry")?;
        let path = entry.path();
        if path == hidden {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follow symlinks so a linked directory can be opened.
        let is_dir = path.is_dir();
        entries.push(FileEntry { name, path, is_dir });
    }
    entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(entries)
}

/// Plain files in `dir`, sorted by name.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).context("read scratch dir")? {
        let entry = entry.context("read scratch dir entry")?;
        let file_type = entry.file_type().context("read file type")?;
        if file_type.is_dir() {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// `<base>-backup.<ext>` inside `dir`, with `-2`, `-3`, ... appended before
/// the extension when the name is already planned or on disk.
pub(crate) fn archive_path_for(
    source: &Path,
    dir: &Path,
    extension: &str,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let base = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "root".to_string());
    let extension = extension.trim_start_matches('.');
    let file_name = |counter: usize| {
        let suffix = if counter < 2 {
            String::new()
        } else {
            format!("-{counter}")
        };
        if extension.is_empty() {
            format!("{base}{ARCHIVE_SUFFIX}{suffix}")
        } else {
            format!("{base}{ARCHIVE_SUFFIX}{suffix}.{extension}")
        }
    };
    let mut counter = 1;
    loop {
        let candidate = dir.join(file_name(counter));
        if !taken.contains(&candidate) && !candidate.exists() {
            taken.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
    }
}
