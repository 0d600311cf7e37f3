//! Delivery statistics
//!
//! Plain atomics, so the signal handler can count deliveries without leaving
//! async-signal-safe ground.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use super::forwarder::ForwardOutcome;
use crate::core::types::Origin;

/// Live counters shared by the handler and the workers
#[derive(Debug, Default)]
pub struct WatchdogStats {
    external_deliveries: AtomicU64,
    self_deliveries: AtomicU64,
    spawn_failures: AtomicU64,
    notifications: AtomicU64,
    notification_failures: AtomicU64,
    forwards: AtomicU64,
    forward_misses: AtomicU64,
    forward_failures: AtomicU64,
}

impl WatchdogStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_delivery(&self, origin: Origin) {
        match origin {
            Origin::External => self.external_deliveries.fetch_add(1, Ordering::Relaxed),
            Origin::SelfSent => self.self_deliveries.fetch_add(1, Ordering::Relaxed),
        };
    }

    #[inline]
    pub fn record_spawn_failure(&self) {
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_forward(&self, outcome: &ForwardOutcome) {
        let counter = match outcome {
            ForwardOutcome::Forwarded(_) => &self.forwards,
            ForwardOutcome::NoDumpThread => &self.forward_misses,
            ForwardOutcome::Failed { .. } => &self.forward_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            external_deliveries: self.external_deliveries.load(Ordering::Relaxed),
            self_deliveries: self.self_deliveries.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
            forwards: self.forwards.load(Ordering::Relaxed),
            forward_misses: self.forward_misses.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`WatchdogStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub external_deliveries: u64,
    pub self_deliveries: u64,
    pub spawn_failures: u64,
    pub notifications: u64,
    pub notification_failures: u64,
    pub forwards: u64,
    pub forward_misses: u64,
    pub forward_failures: u64,
}

impl StatsSnapshot {
    pub fn total_deliveries(&self) -> u64 {
        self.external_deliveries + self.self_deliveries
    }

    /// Workers that ran to the forward step
    pub fn completed_dispatches(&self) -> u64 {
        self.forwards + self.forward_misses + self.forward_failures
    }
}
