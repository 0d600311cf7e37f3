//! Signal handler and the process-wide handler slot
//!
//! The kernel calls a bare `extern "C"` function, so the state it needs has to
//! be reachable from a static. [`ACTIVE`] holds one strong reference to the
//! [`InterceptionCore`] of the registered watchdog; [`IN_FLIGHT`] counts
//! handler invocations that may still be reading the slot, so a retracting
//! watchdog can wait them out before releasing its reference.
//!
//! Inside the handler only [`HandlerScope`] operations run: classify the
//! delivery, bump atomic counters, spawn one detached worker. Everything else
//! (reading the thread table, logging, calling the listener) happens on the
//! worker.

use std::ffi::{c_char, c_int, c_void};
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use std::sync::Arc;

use nix::sys::signal::Signal;

use super::classifier;
use super::dispatcher::{CallbackDispatcher, DispatchReport};
use super::stats::WatchdogStats;
use crate::core::types::Origin;
use crate::os::{current_pid, SigInfoHandler};

/// Name given to worker threads
pub const WORKER_THREAD_NAME: &str = "anr-watchdog";

const WORKER_THREAD_NAME_C: &[u8] = b"anr-watchdog\0";

static ACTIVE: AtomicPtr<InterceptionCore> = AtomicPtr::new(ptr::null_mut());
static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

/// State shared by the handler and the workers of one registration
#[derive(Debug)]
pub struct InterceptionCore {
    signal: Signal,
    dispatcher: CallbackDispatcher,
    stats: Arc<WatchdogStats>,
}

impl InterceptionCore {
    pub fn new(signal: Signal, dispatcher: CallbackDispatcher, stats: Arc<WatchdogStats>) -> Self {
        Self {
            signal,
            dispatcher,
            stats,
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn stats(&self) -> &Arc<WatchdogStats> {
        &self.stats
    }

    pub fn dispatcher(&self) -> &CallbackDispatcher {
        &self.dispatcher
    }

    /// Worker body for one delivery
    pub fn dispatch(&self, origin: Origin) -> DispatchReport {
        self.dispatcher.run(origin)
    }
}

/// The handler to install
pub fn signal_handler() -> SigInfoHandler {
    on_signal
}

/// Make `core` the target of the process signal handler
///
/// Returns `false`, leaving the slot untouched, when another core is already
/// published.
pub(crate) fn publish(core: &Arc<InterceptionCore>) -> bool {
    let raw = Arc::into_raw(Arc::clone(core)) as *mut InterceptionCore;
    match ACTIVE.compare_exchange(ptr::null_mut(), raw, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => true,
        Err(_) => {
            // SAFETY: `raw` came from `Arc::into_raw` above and was never shared
            unsafe { drop(Arc::from_raw(raw)) };
            false
        }
    }
}

/// Clear the slot if it holds `core`, waiting for handler invocations that
/// may have loaded it
///
/// Returns `false` when `core` was not the published one.
pub(crate) fn retract(core: &Arc<InterceptionCore>) -> bool {
    let raw = Arc::as_ptr(core) as *mut InterceptionCore;
    if ACTIVE
        .compare_exchange(raw, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return false;
    }

    while IN_FLIGHT.load(Ordering::SeqCst) != 0 {
        std::hint::spin_loop();
    }

    // SAFETY: the slot owned one strong count, taken in `publish`; no handler
    // can still observe the pointer
    unsafe { drop(Arc::from_raw(raw)) };
    true
}

/// Whether some core is currently published
pub fn is_published() -> bool {
    !ACTIVE.load(Ordering::SeqCst).is_null()
}

/// What the signal handler is allowed to do
///
/// Every method is async-signal-safe apart from the thread spawn, which the
/// platform C library tolerates from signal context.
struct HandlerScope<'a> {
    core: &'a InterceptionCore,
    raw: *const InterceptionCore,
}

impl<'a> HandlerScope<'a> {
    /// # Safety
    /// `raw` must be the published core, kept alive by the in-flight count.
    unsafe fn enter(raw: *const InterceptionCore) -> Self {
        Self { core: &*raw, raw }
    }

    /// # Safety
    /// `info` must be null or the record passed to the handler.
    unsafe fn classify(&self, info: *const libc::siginfo_t) -> Origin {
        classifier::classify_siginfo(info, current_pid())
    }

    fn record(&self, origin: Origin) {
        self.core.stats.record_delivery(origin);
    }

    /// Hand the delivery to a detached worker that owns one strong count
    fn spawn_worker(&self, origin: Origin) {
        // SAFETY: the count handed to the worker is released by it, or below
        // if the thread never starts
        unsafe {
            Arc::increment_strong_count(self.raw);
            if spawn_detached(self.raw, origin).is_err() {
                Arc::decrement_strong_count(self.raw);
                self.core.stats.record_spawn_failure();
            }
        }
    }
}

extern "C" fn on_signal(_signo: c_int, info: *mut libc::siginfo_t, _context: *mut c_void) {
    // SAFETY: errno belongs to the interrupted thread; put it back untouched
    let saved_errno = unsafe { *errno_location() };

    IN_FLIGHT.fetch_add(1, Ordering::SeqCst);
    let raw = ACTIVE.load(Ordering::SeqCst);
    if !raw.is_null() {
        // SAFETY: the slot cannot be released while IN_FLIGHT is non-zero
        let scope = unsafe { HandlerScope::enter(raw) };
        let origin = unsafe { scope.classify(info) };
        scope.record(origin);
        scope.spawn_worker(origin);
    }
    IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);

    unsafe { *errno_location() = saved_errno };
}

/// Start a detached pthread running the worker for `origin`
///
/// # Safety
/// `core` must carry one strong count for the new thread to take over.
unsafe fn spawn_detached(core: *const InterceptionCore, origin: Origin) -> Result<(), c_int> {
    let mut attr: libc::pthread_attr_t = mem::zeroed();
    let rc = libc::pthread_attr_init(&mut attr);
    if rc != 0 {
        return Err(rc);
    }

    let rc = libc::pthread_attr_setdetachstate(&mut attr, libc::PTHREAD_CREATE_DETACHED);
    if rc != 0 {
        libc::pthread_attr_destroy(&mut attr);
        return Err(rc);
    }

    let entry: extern "C" fn(*mut c_void) -> *mut c_void = match origin {
        Origin::External => external_worker_entry,
        Origin::SelfSent => self_worker_entry,
    };

    let mut thread: libc::pthread_t = mem::zeroed();
    let rc = libc::pthread_create(&mut thread, &attr, entry, core as *mut c_void);
    libc::pthread_attr_destroy(&mut attr);

    if rc == 0 {
        Ok(())
    } else {
        Err(rc)
    }
}

extern "C" fn external_worker_entry(arg: *mut c_void) -> *mut c_void {
    run_worker(arg, Origin::External)
}

extern "C" fn self_worker_entry(arg: *mut c_void) -> *mut c_void {
    run_worker(arg, Origin::SelfSent)
}

fn run_worker(arg: *mut c_void, origin: Origin) -> *mut c_void {
    // SAFETY: `spawn_worker` handed this thread one strong count
    let core = unsafe { Arc::from_raw(arg as *const InterceptionCore) };

    unsafe {
        libc::pthread_setname_np(
            libc::pthread_self(),
            WORKER_THREAD_NAME_C.as_ptr() as *const c_char,
        );
    }

    match panic::catch_unwind(AssertUnwindSafe(|| core.dispatch(origin))) {
        Ok(report) => {
            tracing::debug!(
                "Handled {} delivery of {}: notified={}, forward={:?}",
                report.origin,
                core.signal(),
                report.notified,
                report.forward
            );
        }
        Err(_) => {
            tracing::error!("Watchdog worker panicked while handling {}", core.signal());
        }
    }

    ptr::null_mut()
}

#[cfg(target_os = "android")]
unsafe fn errno_location() -> *mut c_int {
    libc::__errno()
}

#[cfg(not(target_os = "android"))]
unsafe fn errno_location() -> *mut c_int {
    libc::__errno_location()
}
