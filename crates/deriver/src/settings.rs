use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const SETTINGS_FILE: &str = "deriver.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeriverSettings {
    /// Deadline after which an in-flight step is cancelled. Unset or zero
    /// disables the deadline.
    pub step_timeout_ms: Option<u64>,
    pub log_filter: String,
}

impl Default for DeriverSettings {
    fn default() -> Self {
        Self {
            step_timeout_ms: None,
            log_filter: "info".into(),
        }
    }
}

impl DeriverSettings {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid settings file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid log filter: {0}")]
    LogFilter(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// Defaults, then `deriver.toml` in the working directory when present and
/// valid, then environment overrides.
pub fn load_settings() -> DeriverSettings {
    load_settings_at(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Same layering as [`load_settings`] with an explicit file and variable
/// source. A missing file is skipped; a malformed one is logged and skipped.
pub fn load_settings_at(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> DeriverSettings {
    let mut settings = match load_settings_from(path) {
        Ok(settings) => settings,
        Err(err @ SettingsError::Parse { .. }) => {
            warn!(%err, "ignoring settings file");
            DeriverSettings::default()
        }
        Err(_) => DeriverSettings::default(),
    };
    apply_env_overrides(&mut settings, lookup);
    settings
}

pub fn load_settings_from(path: &Path) -> Result<DeriverSettings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides(settings: &mut DeriverSettings, lookup: impl Fn(&str) -> Option<String>) {
    for key in ["DERIVER_STEP_TIMEOUT_MS", "APP__STEP_TIMEOUT_MS"] {
        if let Some(v) = lookup(key) {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                settings.step_timeout_ms = Some(parsed);
            }
        }
    }

    for key in ["DERIVER_LOG", "APP__LOG_FILTER"] {
        if let Some(v) = lookup(key) {
            settings.log_filter = v;
        }
    }
}

/// Installs a global `fmt` subscriber filtered by `settings.log_filter`.
pub fn init_tracing(settings: &DeriverSettings) -> Result<(), SettingsError> {
    let filter = EnvFilter::try_new(&settings.log_filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| SettingsError::Subscriber(err.to_string()))
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
