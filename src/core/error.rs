//! Error types for the ANR watchdog
//!
//! Setup failures surface from `Watchdog::start`. Everything that happens on
//! the worker thread after a delivery degrades silently (see `RuntimeError`),
//! there is no caller to report to.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for watchdog lifecycle operations
pub type Result<T> = std::result::Result<T, WatchdogError>;

/// Errors raised while installing the interception
#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("Signal {0} cannot be intercepted")]
    SignalUnsupported(String),

    #[error("Failed to read current disposition of {signal}: {source}")]
    CaptureFailed {
        signal: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install handler for {signal}: {source}")]
    InstallFailed {
        signal: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to unblock {signal} in the calling thread: {source}")]
    MaskFailed {
        signal: String,
        #[source]
        source: nix::Error,
    },

    #[error("Another watchdog already owns the process signal handler")]
    AlreadyInstalled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the managed-runtime collaborator
///
/// These never leave the worker thread. They are logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Execution handle unavailable: {0}")]
    HandleUnavailable(String),

    #[error("Listener invocation failed: {0}")]
    ListenerFailed(String),
}
