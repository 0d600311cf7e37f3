//! Core Module
//!
//! Error taxonomy and the small value types shared by the OS layer and the
//! watchdog itself.

pub mod error;
pub mod types;

// Re-export commonly used items
pub use error::{Result, RuntimeError, WatchdogError};
pub use types::{Origin, Pid, RegistrationState, ThreadDescriptor, Tid};
