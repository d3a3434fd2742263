//! # Dispatcher
//!
//! Executes one broadcast end to end:
//!
//! ```text
//! Idle ──► Resolving ──► Dispatching ──► Idle
//!            │              │
//!            │              ├─ type mismatch  ─► record error, skip
//!            │              ├─ callback Err   ─► record error, continue
//!            │              └─ callback panic ─► record error, continue
//!            └─ registry.resolve(tag): owned snapshot, lock released
//! ```
//!
//! The dispatcher holds no state between calls. Listeners registered while a
//! pass is running are not part of it; listeners unregistered while a pass is
//! running are still invoked if they were in the snapshot.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use message_types::{Envelope, PayloadType, Tag};
use tracing::{error, trace};

use crate::error::{AggregateError, ListenerError};
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::registry::{ChannelRegistry, ListenerRecord};

static NO_METRICS: NoOpMetrics = NoOpMetrics;

/// Outcome of one broadcast.
#[derive(Debug)]
pub struct DispatchReport {
    tag: Tag,
    payload_type: PayloadType,
    resolved: usize,
    invoked: usize,
    errors: Vec<ListenerError>,
}

impl DispatchReport {
    /// Broadcast tag.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Runtime type of the broadcast payload.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Listeners in the snapshot.
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.resolved
    }

    /// Callbacks actually run (type-mismatched listeners are not counted).
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.invoked
    }

    /// Per-listener failures, in visit order.
    #[must_use]
    pub fn errors(&self) -> &[ListenerError] {
        &self.errors
    }

    /// `true` if no listener failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Take the collected errors, leaving the report clean.
    pub fn take_errors(&mut self) -> Vec<ListenerError> {
        std::mem::take(&mut self.errors)
    }

    /// `Ok` if clean, otherwise every error wrapped in an [`AggregateError`].
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(self.tag, self.errors))
        }
    }
}

/// Runs broadcasts against a [`ChannelRegistry`].
pub struct Dispatcher<'a> {
    registry: &'a ChannelRegistry,
    metrics: &'a dyn MetricsRecorder,
    catch_panics: bool,
}

impl<'a> Dispatcher<'a> {
    /// Dispatcher over `registry` with panic isolation on and no metrics.
    #[must_use]
    pub fn new(registry: &'a ChannelRegistry) -> Self {
        Self {
            registry,
            metrics: &NO_METRICS,
            catch_panics: true,
        }
    }

    /// Report into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: &'a dyn MetricsRecorder) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether a panicking listener is contained (`true`) or unwinds into the
    /// broadcaster (`false`).
    #[must_use]
    pub fn catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    /// Deliver `envelope` to every matching listener.
    pub fn dispatch(&self, envelope: &Envelope<'_>) -> DispatchReport {
        let started = Instant::now();
        let tag = envelope.tag();
        let actual = envelope.payload_type();

        let snapshot = self.registry.resolve(tag);
        let mut report = DispatchReport {
            tag: tag.clone(),
            payload_type: actual,
            resolved: snapshot.len(),
            invoked: 0,
            errors: Vec::new(),
        };

        for record in snapshot.iter() {
            if let Some(expected) = record.expected_type().filter(|e| *e != actual) {
                error!(
                    tag = %tag,
                    listener_tag = %record.tag(),
                    handle = record.handle().id(),
                    expected = expected.name(),
                    actual = actual.name(),
                    "Payload type mismatch, listener skipped"
                );
                let err = ListenerError::PayloadTypeMismatch {
                    tag: tag.clone(),
                    listener_tag: record.tag().clone(),
                    handle: record.handle().clone(),
                    expected,
                    actual,
                };
                self.metrics.record_listener_error(tag, err.kind());
                report.errors.push(err);
                continue;
            }

            report.invoked += 1;
            self.metrics.record_invocation(tag);
            if let Err(err) = self.invoke(record, envelope) {
                self.metrics.record_listener_error(tag, err.kind());
                report.errors.push(err);
            }
        }

        self.metrics
            .record_broadcast(tag, report.resolved, started.elapsed());
        trace!(
            tag = %tag,
            resolved = report.resolved,
            invoked = report.invoked,
            errors = report.errors.len(),
            "Broadcast dispatched"
        );

        report
    }

    fn invoke(&self, record: &ListenerRecord, envelope: &Envelope<'_>) -> Result<(), ListenerError> {
        let outcome = if self.catch_panics {
            panic::catch_unwind(AssertUnwindSafe(|| record.invoke(envelope))).map_err(|payload| {
                ListenerError::Panicked {
                    tag: envelope.tag().clone(),
                    handle: record.handle().clone(),
                    message: panic_message(payload.as_ref()),
                }
            })?
        } else {
            record.invoke(envelope)
        };

        outcome.map_err(|source| ListenerError::Invocation {
            tag: envelope.tag().clone(),
            handle: record.handle().clone(),
            source,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
