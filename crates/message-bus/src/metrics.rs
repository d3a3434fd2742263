//! Metrics hooks for bus operations.
//!
//! The bus reports through [`MetricsRecorder`]. [`Metrics`] is an in-process
//! atomic collector; [`NoOpMetrics`] is the default. External systems (the
//! `message-telemetry` crate ships a Prometheus one) implement the trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use message_types::Tag;

use crate::error::ListenerErrorKind;

/// Sink for bus instrumentation.
pub trait MetricsRecorder: Send + Sync {
    /// A listener was added under `tag`.
    fn record_registered(&self, tag: &Tag);

    /// A listener was removed from `tag`.
    fn record_unregistered(&self, tag: &Tag);

    /// A broadcast on `tag` finished after resolving `resolved` listeners.
    fn record_broadcast(&self, tag: &Tag, resolved: usize, duration: Duration);

    /// A listener callback ran (successfully or not).
    fn record_invocation(&self, tag: &Tag);

    /// A listener failed during a broadcast on `tag`.
    fn record_listener_error(&self, tag: &Tag, kind: ListenerErrorKind);
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_registered(&self, _: &Tag) {}
    fn record_unregistered(&self, _: &Tag) {}
    fn record_broadcast(&self, _: &Tag, _: usize, _: Duration) {}
    fn record_invocation(&self, _: &Tag) {}
    fn record_listener_error(&self, _: &Tag, _: ListenerErrorKind) {}
}

/// Atomic counters for bus activity.
#[derive(Debug, Default)]
pub struct Metrics {
    pub listeners_registered: AtomicU64,
    pub listeners_unregistered: AtomicU64,
    pub broadcasts: AtomicU64,
    /// Broadcasts that resolved no listener at all.
    pub broadcasts_unheard: AtomicU64,
    pub invocations: AtomicU64,
    pub type_mismatches: AtomicU64,
    pub invocation_failures: AtomicU64,
    pub panics: AtomicU64,
    /// Cumulative broadcast time in nanoseconds.
    pub broadcast_time_ns: AtomicU64,
}

impl Metrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let registered = self.listeners_registered.load(Ordering::Relaxed);
        let unregistered = self.listeners_unregistered.load(Ordering::Relaxed);
        MetricsSnapshot {
            listeners_registered: registered,
            listeners_unregistered: unregistered,
            listeners_active: registered.saturating_sub(unregistered),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcasts_unheard: self.broadcasts_unheard.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            type_mismatches: self.type_mismatches.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            avg_broadcast_ns: self.avg_broadcast_time_ns(),
        }
    }

    /// Average broadcast time in nanoseconds.
    pub fn avg_broadcast_time_ns(&self) -> u64 {
        let total = self.broadcast_time_ns.load(Ordering::Relaxed);
        let count = self.broadcasts.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.listeners_registered.store(0, Ordering::Relaxed);
        self.listeners_unregistered.store(0, Ordering::Relaxed);
        self.broadcasts.store(0, Ordering::Relaxed);
        self.broadcasts_unheard.store(0, Ordering::Relaxed);
        self.invocations.store(0, Ordering::Relaxed);
        self.type_mismatches.store(0, Ordering::Relaxed);
        self.invocation_failures.store(0, Ordering::Relaxed);
        self.panics.store(0, Ordering::Relaxed);
        self.broadcast_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub listeners_registered: u64,
    pub listeners_unregistered: u64,
    pub listeners_active: u64,
    pub broadcasts: u64,
    pub broadcasts_unheard: u64,
    pub invocations: u64,
    pub type_mismatches: u64,
    pub invocation_failures: u64,
    pub panics: u64,
    pub avg_broadcast_ns: u64,
}

impl MetricsRecorder for Metrics {
    fn record_registered(&self, _: &Tag) {
        self.listeners_registered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unregistered(&self, _: &Tag) {
        self.listeners_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_broadcast(&self, _: &Tag, resolved: usize, duration: Duration) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        if resolved == 0 {
            self.broadcasts_unheard.fetch_add(1, Ordering::Relaxed);
        }
        self.broadcast_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    fn record_invocation(&self, _: &Tag) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    fn record_listener_error(&self, _: &Tag, kind: ListenerErrorKind) {
        let counter = match kind {
            ListenerErrorKind::TypeMismatch => &self.type_mismatches,
            ListenerErrorKind::Invocation => &self.invocation_failures,
            ListenerErrorKind::Panicked => &self.panics,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
