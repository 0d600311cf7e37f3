//! Thread-directed signal delivery

use std::ffi::c_int;
use std::io;

use nix::sys::signal::Signal;

use super::ThreadSignaler;
use crate::core::types::{Pid, Tid};

/// Id of the current process
///
/// Async-signal-safe.
#[inline]
pub fn current_pid() -> Pid {
    unsafe { libc::getpid() }
}

/// Sends signals with `tgkill(2)`, scoped to the current thread group so a
/// recycled tid in another process can never be hit
#[derive(Debug, Clone, Copy, Default)]
pub struct TgkillSignaler;

impl TgkillSignaler {
    pub fn new() -> Self {
        Self
    }
}

impl ThreadSignaler for TgkillSignaler {
    fn signal_thread(&self, tid: Tid, signal: Signal) -> io::Result<()> {
        let rc = unsafe { libc::syscall(libc::SYS_tgkill, current_pid(), tid, signal as c_int) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
