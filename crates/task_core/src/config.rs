use std::{
    env, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "task_manager.toml";
pub const SETTINGS_PATH_ENV: &str = "TASK_MANAGER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long "done" stays on the status display before it clears.
    pub completion_dwell_ms: u64,
    /// How long "cancelled" stays on the status display before it clears.
    pub cancelled_dwell_ms: u64,
    /// Keep only the newest undelivered snapshot per run.
    pub coalesce_progress: bool,
    pub event_queue_capacity: usize,
    pub worker_thread_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            completion_dwell_ms: 3000,
            cancelled_dwell_ms: 3000,
            coalesce_progress: true,
            event_queue_capacity: 1024,
            worker_thread_prefix: "task-worker".into(),
        }
    }
}

impl Settings {
    pub fn completion_dwell(&self) -> Duration {
        Duration::from_millis(self.completion_dwell_ms)
    }

    pub fn cancelled_dwell(&self) -> Duration {
        Duration::from_millis(self.cancelled_dwell_ms)
    }
}

/// Defaults, then `task_manager.toml` (or `$TASK_MANAGER_CONFIG`), then
/// `APP__*` environment overrides. Problems are logged and skipped.
pub fn load_settings() -> Settings {
    let path = env::var(SETTINGS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(SETTINGS_FILE));

    let mut settings = match read_settings_file(&path) {
        Ok(Some(settings)) => settings,
        Ok(None) => Settings::default(),
        Err(err) => {
            tracing::warn!("ignoring settings file: {err:#}");
            Settings::default()
        }
    };

    apply_env_overrides(&mut settings, |key| env::var(key).ok());
    settings
}

/// Returns `Ok(None)` when the file does not exist.
pub fn read_settings_file(path: &Path) -> anyhow::Result<Option<Settings>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))
        }
    };

    let settings = toml::from_str::<Settings>(&raw)
        .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    Ok(Some(settings))
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__COMPLETION_DWELL_MS") {
        if let Some(parsed) = parse_var("APP__COMPLETION_DWELL_MS", &v) {
            settings.completion_dwell_ms = parsed;
        }
    }

    if let Some(v) = lookup("APP__CANCELLED_DWELL_MS") {
        if let Some(parsed) = parse_var("APP__CANCELLED_DWELL_MS", &v) {
            settings.cancelled_dwell_ms = parsed;
        }
    }

    if let Some(v) = lookup("APP__COALESCE_PROGRESS") {
        if let Some(parsed) = parse_flag("APP__COALESCE_PROGRESS", &v) {
            settings.coalesce_progress = parsed;
        }
    }

    if let Some(v) = lookup("APP__EVENT_QUEUE_CAPACITY") {
        match parse_var::<usize>("APP__EVENT_QUEUE_CAPACITY", &v) {
            Some(0) => tracing::warn!("ignoring APP__EVENT_QUEUE_CAPACITY=0: must be positive"),
            Some(parsed) => settings.event_queue_capacity = parsed,
            None => {}
        }
    }

    if let Some(v) = lookup("APP__WORKER_THREAD_PREFIX") {
        let v = v.trim();
        if !v.is_empty() {
            settings.worker_thread_prefix = v.to_string();
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("ignoring {key}={raw:?}: not a valid value");
            None
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("ignoring {key}={raw:?}: expected true or false");
            None
        }
    }
}
