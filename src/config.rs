// Layered configuration: defaults, YAML file, then environment

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub const ENV_BACKEND: &str = "TASKTRACK_BACKEND";
pub const ENV_DATA_DIR: &str = "TASKTRACK_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "TASKTRACK_LOG_LEVEL";

/// Which persistence backend the store writes through to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Jsonl,
    Sqlite,
}

impl FromStr for BackendKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "jsonl" => Ok(BackendKind::Jsonl),
            "sqlite" => Ok(BackendKind::Sqlite),
            other => Err(eyre!("Unknown backend: {} (expected memory, jsonl or sqlite)", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Memory => "memory",
            BackendKind::Jsonl => "jsonl",
            BackendKind::Sqlite => "sqlite",
        })
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

/// `<platform data dir>/tasktrack`, or `./.tasktrack` when the platform has none
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("tasktrack"))
        .unwrap_or_else(|| PathBuf::from(".tasktrack"))
}

/// `<platform config dir>/tasktrack/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tasktrack").join("config.yaml"))
}

impl Config {
    /// Load from `path` (or the default location) and apply environment overrides
    ///
    /// An explicitly given path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(?path, "Loading config file");
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `TASKTRACK_*` overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty(ENV_BACKEND) {
            self.backend = v.parse().with_context(|| format!("Invalid {}", ENV_BACKEND))?;
        }
        if let Some(v) = non_empty(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        Ok(())
    }
}
