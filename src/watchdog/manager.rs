//! Signal Interception Manager
//!
//! Owns the process-wide interception of the watched signal: captures the
//! disposition that was there before, installs the watchdog handler, and puts
//! everything back on `stop` (or drop).

use std::sync::Arc;

use nix::sys::signal::{SigSet, Signal};

use super::discovery::DumpThreadDiscovery;
use super::dispatcher::CallbackDispatcher;
use super::forwarder::Forwarder;
use super::handler::{self, InterceptionCore};
use super::runtime::{FnRuntime, ListenerBinding, ManagedRuntime};
use super::stats::{StatsSnapshot, WatchdogStats};
use crate::config::WatchdogConfig;
use crate::core::error::{Result, WatchdogError};
use crate::core::types::RegistrationState;
use crate::os::{
    restore_thread_mask, unblock_in_current_thread, DispositionTable, KernelDispositions,
    ProcThreadLister, RawDisposition, ThreadLister, ThreadSignaler, TgkillSignaler,
};

/// What was in place before registration
#[derive(Debug, Clone, Copy)]
struct SignalDisposition {
    action: RawDisposition,
    /// Calling thread's mask before unblocking, when unblocking was done
    mask: Option<SigSet>,
}

/// The ANR watchdog
///
/// At most one instance can be registered per process; a second `start`
/// while another instance is registered fails with
/// [`WatchdogError::AlreadyInstalled`].
///
/// # Example
///
/// ```no_run
/// use anr_watchdog::{Watchdog, WatchdogConfig};
///
/// let mut watchdog = Watchdog::with_listener(WatchdogConfig::default(), || {
///     eprintln!("ANR reported");
/// })?;
/// watchdog.start()?;
/// // ...
/// watchdog.stop();
/// # Ok::<(), anr_watchdog::WatchdogError>(())
/// ```
pub struct Watchdog {
    signal: Signal,
    unblock_on_register: bool,
    dispositions: Arc<dyn DispositionTable>,
    core: Arc<InterceptionCore>,
    state: RegistrationState,
    saved: Option<SignalDisposition>,
}

impl Watchdog {
    pub fn builder() -> WatchdogBuilder {
        WatchdogBuilder::default()
    }

    /// Watchdog that forwards only, with no listener
    pub fn new(config: WatchdogConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Watchdog whose listener is a Rust closure
    pub fn with_listener<F>(config: WatchdogConfig, listener: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::builder()
            .config(config)
            .runtime(Arc::new(FnRuntime::new(listener)), ListenerBinding::in_process())
            .build()
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats().snapshot()
    }

    /// Install the interception
    ///
    /// Does nothing if already registered. On failure nothing is left
    /// installed and the state stays `Unregistered`.
    pub fn start(&mut self) -> Result<()> {
        if self.is_registered() {
            tracing::debug!("Watchdog already registered for {}", self.signal);
            return Ok(());
        }

        let signal_name = self.signal.as_str().to_string();

        // Confirms the signal is interceptable before anything is published
        self.dispositions.query(self.signal).map_err(|source| {
            if source.raw_os_error() == Some(libc::EINVAL) {
                WatchdogError::SignalUnsupported(signal_name.clone())
            } else {
                WatchdogError::CaptureFailed {
                    signal: signal_name.clone(),
                    source,
                }
            }
        })?;

        if !handler::publish(&self.core) {
            return Err(WatchdogError::AlreadyInstalled);
        }

        let ours = RawDisposition::siginfo_handler(handler::signal_handler());
        let action = match self.dispositions.install(self.signal, &ours) {
            Ok(previous) => previous,
            Err(source) => {
                handler::retract(&self.core);
                return Err(WatchdogError::InstallFailed {
                    signal: signal_name,
                    source,
                });
            }
        };

        let mask = if self.unblock_on_register {
            match unblock_in_current_thread(self.signal) {
                Ok(previous) => Some(previous),
                Err(source) => {
                    self.put_back(&action);
                    handler::retract(&self.core);
                    return Err(WatchdogError::MaskFailed {
                        signal: signal_name,
                        source,
                    });
                }
            }
        } else {
            None
        };

        self.saved = Some(SignalDisposition { action, mask });
        self.state = RegistrationState::Registered;
        tracing::info!(
            "ANR watchdog registered for {} (previous handler {:?})",
            self.signal,
            action
        );
        Ok(())
    }

    /// Remove the interception, restoring what `start` replaced
    ///
    /// Does nothing if not registered. The thread mask saved by `start` is
    /// applied to the calling thread.
    pub fn stop(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        self.put_back(&saved.action);

        if let Some(mask) = saved.mask {
            if let Err(e) = restore_thread_mask(&mask) {
                tracing::warn!("Failed to restore signal mask: {}", e);
            }
        }

        handler::retract(&self.core);
        self.state = RegistrationState::Unregistered;
        tracing::info!("ANR watchdog unregistered for {}", self.signal);
    }

    /// Reinstall `action`, falling back to the default action
    fn put_back(&self, action: &RawDisposition) {
        let signal = self.signal;
        if let Err(e) = self.dispositions.install(signal, action) {
            tracing::warn!(
                "Failed to restore previous handler for {}: {}, falling back to default",
                signal,
                e
            );
            let default = RawDisposition::default_action();
            if let Err(e) = self.dispositions.install(signal, &default) {
                tracing::error!("Failed to reset {} to its default action: {}", signal, e);
            }
        }
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("signal", &self.signal)
            .field("state", &self.state)
            .field("saved", &self.saved)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`Watchdog`]
#[derive(Default)]
pub struct WatchdogBuilder {
    config: WatchdogConfig,
    runtime: Option<(Arc<dyn ManagedRuntime>, ListenerBinding)>,
    lister: Option<Arc<dyn ThreadLister>>,
    signaler: Option<Arc<dyn ThreadSignaler>>,
    dispositions: Option<Arc<dyn DispositionTable>>,
}

impl WatchdogBuilder {
    pub fn config(mut self, config: WatchdogConfig) -> Self {
        self.config = config;
        self
    }

    /// Listener to notify on external deliveries
    pub fn runtime(mut self, runtime: Arc<dyn ManagedRuntime>, binding: ListenerBinding) -> Self {
        self.runtime = Some((runtime, binding));
        self
    }

    /// Thread table to search for the dump thread (default: `config.task_dir`)
    pub fn thread_lister(mut self, lister: Arc<dyn ThreadLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// How forwards are delivered (default: `tgkill`)
    pub fn thread_signaler(mut self, signaler: Arc<dyn ThreadSignaler>) -> Self {
        self.signaler = Some(signaler);
        self
    }

    /// Where dispositions are read and written (default: `sigaction(2)`)
    pub fn dispositions(mut self, dispositions: Arc<dyn DispositionTable>) -> Self {
        self.dispositions = Some(dispositions);
        self
    }

    pub fn build(self) -> Result<Watchdog> {
        self.config.validate()?;
        let signal = self.config.watched_signal()?;

        let lister = self.lister.unwrap_or_else(|| {
            Arc::new(ProcThreadLister::new(self.config.task_dir.clone())) as Arc<dyn ThreadLister>
        });
        let signaler = self
            .signaler
            .unwrap_or_else(|| Arc::new(TgkillSignaler::new()) as Arc<dyn ThreadSignaler>);
        let dispositions = self
            .dispositions
            .unwrap_or_else(|| Arc::new(KernelDispositions) as Arc<dyn DispositionTable>);

        let discovery = DumpThreadDiscovery::new(lister, self.config.dump_thread_names.clone());
        let forwarder = Forwarder::new(signal, discovery, signaler);
        let stats = Arc::new(WatchdogStats::new());

        let mut dispatcher = CallbackDispatcher::new(forwarder, Arc::clone(&stats));
        if let Some((runtime, binding)) = self.runtime {
            dispatcher = dispatcher.with_listener(runtime, binding);
        }

        Ok(Watchdog {
            signal,
            unblock_on_register: self.config.unblock_on_register,
            dispositions,
            core: Arc::new(InterceptionCore::new(signal, dispatcher, stats)),
            state: RegistrationState::Unregistered,
            saved: None,
        })
    }
}

impl std::fmt::Debug for WatchdogBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogBuilder")
            .field("config", &self.config)
            .field("has_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}
