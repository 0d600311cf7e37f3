//! Shared value types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Process id as the kernel reports it
pub type Pid = libc::pid_t;

/// Kernel thread id (the numeric entry under `/proc/<pid>/task`)
pub type Tid = libc::pid_t;

/// Who sent a watched-signal delivery
///
/// Derived per delivery from the sender fields of the kernel `siginfo`, never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The current process signalled itself (its own dump tooling)
    #[serde(rename = "self")]
    SelfSent,
    /// Any other sender, typically the platform's ANR detection
    External,
}

impl Origin {
    /// Whether this delivery should reach the listener
    pub fn notifies_listener(&self) -> bool {
        matches!(self, Origin::External)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::SelfSent => write!(f, "self"),
            Origin::External => write!(f, "external"),
        }
    }
}

/// Lifecycle of the process-wide interception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Registered,
}

/// One live thread of the current process, as found by a table scan
///
/// Transient: the table is rescanned on every forward.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadDescriptor {
    pub tid: Tid,
    pub name: String,
}

impl ThreadDescriptor {
    pub fn new(tid: Tid, name: impl Into<String>) -> Self {
        Self {
            tid,
            name: name.into(),
        }
    }
}
