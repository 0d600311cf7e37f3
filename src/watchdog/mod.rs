//! Watchdog Module
//!
//! Intercepts the platform's stack-dump signal (SIGQUIT on Android) so the
//! host learns about ANR reports, then forwards the signal to the platform's
//! dump thread so the regular dump still gets written.
//!
//! Flow of one delivery:
//! 1. `handler` classifies the sender and spawns a detached worker
//! 2. `dispatcher` notifies the listener through the `runtime` bridge when the
//!    sender was external
//! 3. `forwarder` finds the dump thread via `discovery` and re-sends the signal

pub mod classifier;
pub mod discovery;
pub mod dispatcher;
pub mod forwarder;
pub mod handler;
pub mod manager;
pub mod runtime;
pub mod stats;


pub use classifier::{classify, classify_siginfo};
pub use discovery::DumpThreadDiscovery;
pub use dispatcher::{CallbackDispatcher, DispatchReport};
pub use forwarder::{ForwardOutcome, Forwarder};
pub use handler::{InterceptionCore, WORKER_THREAD_NAME};
pub use manager::{Watchdog, WatchdogBuilder};
pub use runtime::{ExecutionHandle, FnRuntime, ListenerBinding, ManagedRuntime, OpaqueRef};
pub use stats::{StatsSnapshot, WatchdogStats};
