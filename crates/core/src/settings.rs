use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration;
use crate::error::ConfigError;
use crate::types::Level;

/// On-disk defaults for the `jitter` binary (`jitter.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound of the random delay, e.g. `"30s"`.
    pub max_duration: String,
    pub seed: Option<u64>,
    pub timeout_secs: Option<f64>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_duration: "0s".into(),
            seed: None,
            timeout_secs: None,
            log_dir: None,
            log_level: Level::Info,
        }
    }
}

impl Settings {
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::settings(path, e.to_string())),
        };
        serde_json::from_str(&text).map_err(|e| ConfigError::settings(path, e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::settings(path, e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ConfigError::settings(path, e.to_string()))
    }

    pub fn budget(&self) -> Result<Duration, ConfigError> {
        duration::parse_duration(&self.max_duration)
    }

    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.timeout_secs.map(duration::from_secs).transpose()
    }
}
