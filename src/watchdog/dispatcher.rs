//! Callback Dispatcher
//!
//! Work done for one delivery, off the signal handler: notify the listener
//! when the request came from outside the process, then always hand the
//! signal on to the dump thread.

use std::sync::Arc;

use super::forwarder::{ForwardOutcome, Forwarder};
use super::runtime::{ListenerBinding, ManagedRuntime};
use super::stats::WatchdogStats;
use crate::core::error::RuntimeError;
use crate::core::types::Origin;

/// What a dispatch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub origin: Origin,
    /// The listener was called and returned normally
    pub notified: bool,
    pub forward: ForwardOutcome,
}

/// Runs the per-delivery work
#[derive(Clone)]
pub struct CallbackDispatcher {
    listener: Option<(Arc<dyn ManagedRuntime>, ListenerBinding)>,
    forwarder: Forwarder,
    stats: Arc<WatchdogStats>,
}

impl CallbackDispatcher {
    pub fn new(forwarder: Forwarder, stats: Arc<WatchdogStats>) -> Self {
        Self {
            listener: None,
            forwarder,
            stats,
        }
    }

    pub fn with_listener(
        mut self,
        runtime: Arc<dyn ManagedRuntime>,
        binding: ListenerBinding,
    ) -> Self {
        self.listener = Some((runtime, binding));
        self
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }

    /// Handle one delivery
    ///
    /// Listener trouble is logged and counted, never fatal: the forward
    /// happens regardless so the platform dump is not lost.
    pub fn run(&self, origin: Origin) -> DispatchReport {
        tracing::debug!("Dispatching {} delivery of {}", origin, self.forwarder.signal());

        let notified = if origin.notifies_listener() {
            match self.notify() {
                Ok(called) => called,
                Err(e) => {
                    tracing::warn!("ANR listener not notified: {}", e);
                    self.stats.record_notification_failure();
                    false
                }
            }
        } else {
            tracing::debug!("{} sent by this process, skipping listener", self.forwarder.signal());
            false
        };

        let forward = self.forwarder.forward();
        self.stats.record_forward(&forward);
        if let ForwardOutcome::NoDumpThread = forward {
            tracing::debug!("No dump thread to forward {} to", self.forwarder.signal());
        }

        DispatchReport {
            origin,
            notified,
            forward,
        }
    }

    /// Ok(false) when no listener is configured
    fn notify(&self) -> Result<bool, RuntimeError> {
        let Some((runtime, binding)) = &self.listener else {
            return Ok(false);
        };

        let handle = runtime.acquire_execution_handle()?;
        runtime.invoke_listener(handle, binding)?;
        self.stats.record_notification();
        tracing::info!("ANR listener notified");
        Ok(true)
    }
}

impl std::fmt::Debug for CallbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackDispatcher")
            .field("has_listener", &self.has_listener())
            .field("forwarder", &self.forwarder)
            .finish_non_exhaustive()
    }
}
