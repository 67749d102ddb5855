use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::Settings;

const APP_DIR: &str = "backup-tui";
const DEBUG_LOG_NAME: &str = "debug.log";
const LOG_FILE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub(crate) fn config_path() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_DIR);
        dir.push("config.json");
        return Ok(dir);
    }
    let mut fallback = std::env::current_dir().context("current dir")?;
    fallback.push("backup-tui-config.json");
    Ok(fallback)
}

pub(crate) fn log_dir() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::data_local_dir() {
        dir.push(APP_DIR);
        dir.push("logs");
        return Ok(dir);
    }
    std::env::current_dir().context("current dir")
}

/// One file per run, or a fixed `debug.log` that every debug run appends to.
pub(crate) fn log_file_name(debug: bool) -> String {
    if debug {
        DEBUG_LOG_NAME.to_string()
    } else {
        format!("{}.log", chrono::Local::now().format(LOG_FILE_FORMAT))
    }
}

pub(crate) fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path).context("read config file")?;
    let settings = serde_json::from_str(&content).context("parse config file")?;
    Ok(settings)
}

pub(crate) fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config dir")?;
    }
    let content = serde_json::to_string_pretty(settings).context("serialize config")?;
    fs::write(path, content).context("write config file")?;
    Ok(())
}

/// Deletes `.log` files in `dir` last modified more than `retention_days` ago.
pub(crate) fn prune_log_dir(dir: &Path, retention_days: u64) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let cutoff = std::time::Duration::from_secs(retention_days * 24 * 60 * 60);
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("log") {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok());
        if age.is_some_and(|age| age > cutoff) && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompressorConfig;

    #[test]
    fn missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let settings = Settings {
            last_user: Some("pi".to_string()),
            last_host: Some("raspberrypi".to_string()),
            last_browse_dir: Some("/srv".to_string()),
            compressor: CompressorConfig {
                program: "7z".to_string(),
                args: vec!["a".to_string(), "-mx=9".to_string()],
                extension: "7z".to_string(),
            },
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn invalid_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse config file"));
    }

    #[test]
    fn log_file_name_depends_on_debug() {
        assert_eq!(log_file_name(true), "debug.log");
        let name = log_file_name(false);
        assert!(name.ends_with(".log"));
        assert_ne!(name, "debug.log");
    }

    #[test]
    fn prune_log_dir_keeps_fresh_logs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fresh.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(prune_log_dir(dir.path(), 7), 0);
        assert!(dir.path().join("fresh.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
