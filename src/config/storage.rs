//! Watchdog Configuration Storage
//!
//! JSON file-based configuration with:
//! - Defaults for every field, so partial files load
//! - Atomic writes using temp file + rename
//! - Validation of the watched signal and dump-thread names

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Name of the platform thread that writes the stack dump on SIGQUIT
pub const SIGNAL_CATCHER_THREAD_NAME: &str = "Signal Catcher";

/// Truncated spelling some platform versions report for the same thread
pub const SIGNAL_CATCHER_SHORT_NAME: &str = "Signal";

/// Default location of the current process's thread table
pub const DEFAULT_TASK_DIR: &str = "/proc/self/task";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Watchdog configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Watched signal by name (`SIGQUIT` on Android)
    #[serde(default = "default_signal")]
    pub signal: String,

    /// Thread names accepted as the platform dump thread
    #[serde(default = "default_dump_thread_names")]
    pub dump_thread_names: Vec<String>,

    /// Directory listing the live threads of this process
    #[serde(default = "default_task_dir")]
    pub task_dir: PathBuf,

    /// Unblock the watched signal in the registering thread
    #[serde(default = "default_true")]
    pub unblock_on_register: bool,
}

fn default_signal() -> String {
    Signal::SIGQUIT.as_str().to_string()
}

fn default_dump_thread_names() -> Vec<String> {
    vec![
        SIGNAL_CATCHER_THREAD_NAME.to_string(),
        SIGNAL_CATCHER_SHORT_NAME.to_string(),
    ]
}

fn default_task_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TASK_DIR)
}

fn default_true() -> bool {
    true
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            signal: default_signal(),
            dump_thread_names: default_dump_thread_names(),
            task_dir: default_task_dir(),
            unblock_on_register: true,
        }
    }
}

impl WatchdogConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the watched signal
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = signal.as_str().to_string();
        self
    }

    /// Replace the accepted dump-thread names
    pub fn with_dump_thread_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dump_thread_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Point thread discovery at a different task directory
    pub fn with_task_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.task_dir = dir.into();
        self
    }

    /// Parse the watched signal
    ///
    /// Accepts `SIGQUIT` as well as the short form `QUIT`.
    pub fn watched_signal(&self) -> ConfigResult<Signal> {
        let name = self.signal.trim().to_ascii_uppercase();
        let name = if name.starts_with("SIG") {
            name
        } else {
            format!("SIG{}", name)
        };

        let signal = Signal::from_str(&name)
            .map_err(|_| ConfigError::Invalid(format!("unknown signal '{}'", self.signal)))?;

        if matches!(signal, Signal::SIGKILL | Signal::SIGSTOP) {
            return Err(ConfigError::Invalid(format!(
                "{} cannot be caught",
                signal.as_str()
            )));
        }

        Ok(signal)
    }

    /// Check the configuration for values the watchdog cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        self.watched_signal()?;

        if self.dump_thread_names.is_empty() {
            return Err(ConfigError::Invalid(
                "dump_thread_names must not be empty".to_string(),
            ));
        }

        if self.dump_thread_names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "dump_thread_names must not contain empty names".to_string(),
            ));
        }

        if self.task_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("task_dir must be set".to_string()));
        }

        Ok(())
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: WatchdogConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded watchdog configuration from {:?}", path);
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when it is absent
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => {
                tracing::debug!("No configuration at {:?}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write the configuration to disk
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;

        // Atomic rename
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }
}
