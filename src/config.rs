use std::{io::ErrorKind, path::{Path, PathBuf}, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pomodoro::PomodoroSettings;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const CONFIG_FILE: &str = "config.json";
const DEFAULT_CACHE_STALE_SECONDS: u64 = 30;

/// Optional `config.json` in the application directory. Every field may be left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_seconds: u64,
    pub cache_stale_seconds: u64,
    pub pomodoro: PomodoroSettings,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_seconds: 30,
            cache_stale_seconds: DEFAULT_CACHE_STALE_SECONDS,
            pomodoro: PomodoroSettings::default(),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Invalid configuration in {}", path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Couldn't read {}", path.display())),
        }
    }
}

/// Effective configuration. Command line flags (and their environment variables) win over the
/// file, the file wins over defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_dir: PathBuf,
    pub api_url: String,
    pub request_timeout: Duration,
    pub cache_stale_after: chrono::Duration,
    pub pomodoro: PomodoroSettings,
}

impl Config {
    pub fn resolve(app_dir: PathBuf, api_url: Option<String>) -> Result<Self> {
        let file = FileConfig::load(&app_dir.join(CONFIG_FILE))?;
        debug!("Loaded file configuration {file:?}");
        Ok(Self::merge(app_dir, api_url, file))
    }

    fn merge(app_dir: PathBuf, api_url: Option<String>, file: FileConfig) -> Self {
        Self {
            api_url: api_url
                .or(file.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            request_timeout: Duration::from_secs(file.request_timeout_seconds.max(1)),
            cache_stale_after: i64::try_from(file.cache_stale_seconds)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or_else(|| {
                    warn!(
                        "cache_stale_seconds {} is out of range, using {DEFAULT_CACHE_STALE_SECONDS}",
                        file.cache_stale_seconds
                    );
                    chrono::Duration::seconds(DEFAULT_CACHE_STALE_SECONDS as i64)
                }),
            pomodoro: file.pomodoro,
            app_dir,
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.app_dir.join("session.json")
    }

    pub fn pomodoro_path(&self) -> PathBuf {
        self.app_dir.join("pomodoro.json")
    }
}
