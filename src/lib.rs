//! ANR watchdog
//!
//! Native helper that lets a host application observe ANR ("Application Not
//! Responding") reports. The platform asks a process for a stack dump by
//! sending it SIGQUIT; this crate intercepts that signal, tells a listener in
//! the managed environment when the request came from outside the process,
//! and then forwards the signal to the platform's "Signal Catcher" thread so
//! the regular dump is still produced.
//!
//! - `watchdog`: interception lifecycle, handler, dispatch and forwarding
//! - `os`: thread table, thread-directed delivery, dispositions and masks
//! - `config`: watched signal and dump-thread names, JSON persisted
//! - `logging`: tracing subscriber setup

#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error!("anr-watchdog supports Linux and Android only");

pub mod config;
pub mod core;
pub mod logging;
pub mod os;
pub mod watchdog;

// Re-export commonly used items
pub use config::WatchdogConfig;
pub use core::error::{Result, RuntimeError, WatchdogError};
pub use core::types::{Origin, RegistrationState};
pub use watchdog::{
    ExecutionHandle, FnRuntime, ListenerBinding, ManagedRuntime, StatsSnapshot, Watchdog,
    WatchdogBuilder,
};
