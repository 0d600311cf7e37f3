//! Signal dispositions and masks
//!
//! Dispositions are kept as the raw `libc::sigaction` record so a captured
//! disposition can be put back exactly as found, including flags, the handler
//! mask and the restorer. Thread masks go through `nix`.

use std::ffi::{c_int, c_void};
use std::fmt;
use std::io;
use std::mem;
use std::ptr;

use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow, Signal};

/// Extended (`SA_SIGINFO`) handler signature
pub type SigInfoHandler = extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void);

/// A complete disposition record for one signal
#[derive(Clone, Copy)]
pub struct RawDisposition(libc::sigaction);

impl RawDisposition {
    /// Read the disposition currently installed for `signal`
    pub fn query(signal: Signal) -> io::Result<Self> {
        // SAFETY: all-zero is a valid sigaction; the kernel fills it in
        let mut current: libc::sigaction = unsafe { mem::zeroed() };
        let rc = unsafe { libc::sigaction(signal as c_int, ptr::null(), &mut current) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(current))
    }

    /// Extended-info handler running on the alternate stack with restarting
    /// system calls, blocking nothing beyond the signal itself
    pub fn siginfo_handler(handler: SigInfoHandler) -> Self {
        // SAFETY: all-zero is a valid sigaction
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        action.sa_sigaction = handler as libc::sighandler_t;
        action.sa_flags = (libc::SA_ONSTACK | libc::SA_SIGINFO | libc::SA_RESTART) as _;
        unsafe { libc::sigemptyset(&mut action.sa_mask) };
        Self(action)
    }

    /// The OS default action
    pub fn default_action() -> Self {
        // SAFETY: all-zero is a valid sigaction
        let mut action: libc::sigaction = unsafe { mem::zeroed() };
        action.sa_sigaction = libc::SIG_DFL;
        action.sa_flags = libc::SA_RESTART as _;
        unsafe { libc::sigemptyset(&mut action.sa_mask) };
        Self(action)
    }

    /// Install this disposition for `signal`, returning the one it replaced
    pub fn install(&self, signal: Signal) -> io::Result<RawDisposition> {
        // SAFETY: all-zero is a valid sigaction; the kernel fills it in
        let mut previous: libc::sigaction = unsafe { mem::zeroed() };
        let rc = unsafe { libc::sigaction(signal as c_int, &self.0, &mut previous) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(previous))
    }

    /// Handler address (`SIG_DFL`, `SIG_IGN` or a function)
    pub fn handler_address(&self) -> usize {
        self.0.sa_sigaction as usize
    }

    pub fn flags(&self) -> c_int {
        self.0.sa_flags as c_int
    }

    pub fn is_default(&self) -> bool {
        self.0.sa_sigaction == libc::SIG_DFL
    }

    pub fn is_ignore(&self) -> bool {
        self.0.sa_sigaction == libc::SIG_IGN
    }

    /// Whether this disposition runs `handler`
    pub fn runs(&self, handler: SigInfoHandler) -> bool {
        self.handler_address() == handler as usize
    }
}

impl fmt::Debug for RawDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDisposition")
            .field("handler", &format_args!("{:#x}", self.handler_address()))
            .field("flags", &format_args!("{:#x}", self.flags()))
            .finish()
    }
}

/// Where process signal dispositions are read and written
///
/// The watchdog goes through this for every disposition change so that the
/// failure paths of registration can be driven from tests.
pub trait DispositionTable: Send + Sync {
    /// Disposition currently installed for `signal`
    fn query(&self, signal: Signal) -> io::Result<RawDisposition>;

    /// Install `action` for `signal`, returning the disposition it replaced
    fn install(&self, signal: Signal, action: &RawDisposition) -> io::Result<RawDisposition>;
}

/// The process's real disposition table, via `sigaction(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelDispositions;

impl DispositionTable for KernelDispositions {
    fn query(&self, signal: Signal) -> io::Result<RawDisposition> {
        RawDisposition::query(signal)
    }

    fn install(&self, signal: Signal, action: &RawDisposition) -> io::Result<RawDisposition> {
        action.install(signal)
    }
}

/// Unblock `signal` in the calling thread, returning the previous mask
pub fn unblock_in_current_thread(signal: Signal) -> nix::Result<SigSet> {
    change_current_thread_mask(SigmaskHow::SIG_UNBLOCK, signal)
}

/// Block `signal` in the calling thread, returning the previous mask
pub fn block_in_current_thread(signal: Signal) -> nix::Result<SigSet> {
    change_current_thread_mask(SigmaskHow::SIG_BLOCK, signal)
}

fn change_current_thread_mask(how: SigmaskHow, signal: Signal) -> nix::Result<SigSet> {
    let mut set = SigSet::empty();
    set.add(signal);
    let mut previous = SigSet::empty();
    pthread_sigmask(how, Some(&set), Some(&mut previous))?;
    Ok(previous)
}

/// Replace the calling thread's mask
pub fn restore_thread_mask(mask: &SigSet) -> nix::Result<()> {
    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(mask), None)
}

/// Comparable view of how one signal is handled, from the calling thread's
/// point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispositionSnapshot {
    pub handler: usize,
    pub flags: c_int,
    pub blocked: bool,
}

impl DispositionSnapshot {
    pub fn capture(signal: Signal) -> io::Result<Self> {
        let disposition = RawDisposition::query(signal)?;
        let mask = SigSet::thread_get_mask().map_err(io::Error::from)?;
        Ok(Self {
            handler: disposition.handler_address(),
            flags: disposition.flags(),
            blocked: mask.contains(signal),
        })
    }
}
