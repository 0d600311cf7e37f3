//! Forwarder
//!
//! Re-delivers the watched signal to the dump thread so the platform still
//! writes its own dump after the watchdog has seen the request.

use std::sync::Arc;

use nix::sys::signal::Signal;

use super::discovery::DumpThreadDiscovery;
use crate::core::types::Tid;
use crate::os::ThreadSignaler;

/// Result of one forward attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Signal delivered to this thread
    Forwarded(Tid),
    /// No dump thread in the table; nothing was sent
    NoDumpThread,
    /// Thread found but delivery failed (it most likely exited)
    Failed { tid: Tid, errno: Option<i32> },
}

impl ForwardOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, ForwardOutcome::Forwarded(_))
    }
}

/// Sends the watched signal to the discovered dump thread
#[derive(Clone)]
pub struct Forwarder {
    signal: Signal,
    discovery: DumpThreadDiscovery,
    signaler: Arc<dyn ThreadSignaler>,
}

impl Forwarder {
    pub fn new(
        signal: Signal,
        discovery: DumpThreadDiscovery,
        signaler: Arc<dyn ThreadSignaler>,
    ) -> Self {
        Self {
            signal,
            discovery,
            signaler,
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn discovery(&self) -> &DumpThreadDiscovery {
        &self.discovery
    }

    /// Deliver the watched signal to the dump thread, targeting that thread
    /// only rather than the whole process
    ///
    /// A missing dump thread is not an error; the call then does nothing.
    pub fn forward(&self) -> ForwardOutcome {
        let Some(tid) = self.discovery.find_dump_thread_id() else {
            return ForwardOutcome::NoDumpThread;
        };

        match self.signaler.signal_thread(tid, self.signal) {
            Ok(()) => {
                tracing::debug!("Forwarded {} to dump thread {}", self.signal, tid);
                ForwardOutcome::Forwarded(tid)
            }
            Err(e) => {
                tracing::debug!("Failed to forward {} to thread {}: {}", self.signal, tid, e);
                ForwardOutcome::Failed {
                    tid,
                    errno: e.raw_os_error(),
                }
            }
        }
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("signal", &self.signal)
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}
