//! OS Integration Layer
//!
//! Capabilities the watchdog needs from the kernel, behind traits so tests can
//! substitute fixtures:
//! - Listing the live threads of the process and reading their names
//! - Delivering a signal to one specific thread
//! - Reading, installing and restoring signal dispositions and masks

pub mod procfs;
pub mod sigaction;
pub mod tgkill;

#[cfg(test)]
mod tests;

pub use procfs::{parse_status_name, ProcThreadLister};
pub use sigaction::{
    block_in_current_thread, restore_thread_mask, unblock_in_current_thread, DispositionSnapshot,
    DispositionTable, KernelDispositions, RawDisposition, SigInfoHandler,
};
pub use tgkill::{current_pid, TgkillSignaler};

use std::io;

use nix::sys::signal::Signal;

use crate::core::types::Tid;

/// Source of the process's live thread table
///
/// The table changes underneath the reader: a thread listed by `thread_ids`
/// may be gone by the time `thread_name` is asked about it.
pub trait ThreadLister: Send + Sync {
    /// Ids of the threads currently in the table
    fn thread_ids(&self) -> io::Result<Vec<Tid>>;

    /// Human-readable name of one thread
    fn thread_name(&self, tid: Tid) -> io::Result<String>;
}

/// Delivers a signal to a single thread of the current process
pub trait ThreadSignaler: Send + Sync {
    fn signal_thread(&self, tid: Tid, signal: Signal) -> io::Result<()>;
}
