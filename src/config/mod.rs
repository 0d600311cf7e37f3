//! Configuration Module
//!
//! Provides the watchdog configuration with:
//! - JSON file-based storage
//! - Defaults matching the Android runtime (SIGQUIT, "Signal Catcher")
//! - Validation before use

mod storage;

pub use storage::{
    ConfigError, ConfigResult, WatchdogConfig, DEFAULT_TASK_DIR, SIGNAL_CATCHER_SHORT_NAME,
    SIGNAL_CATCHER_THREAD_NAME,
};
