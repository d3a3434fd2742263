//! # Message Bus
//!
//! The public face of the crate: typed registration over the erased
//! [`ChannelRegistry`], broadcasts through the [`Dispatcher`], and the
//! configured error policy applied to the result.
//!
//! ```text
//! ┌──────────────┐  broadcast(tag, &msg)  ┌──────────────┐
//! │ Sender       │ ─────────────────────► │ MessageBus   │
//! └──────────────┘                        │  ├─ resolve  │
//!                                         │  └─ dispatch │
//!                                         └──────┬───────┘
//!                              specific first    │
//!                  ┌─────────────────┬───────────┘
//!                  ▼                 ▼
//!           ┌────────────┐    ┌────────────┐
//!           │ Listener 1 │    │ Listener 2 │
//!           └────────────┘    └────────────┘
//! ```
//!
//! There is no global instance. Share a bus between systems with `Arc`;
//! listeners that need to call back into the bus capture a `Weak` to it.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use message_types::{Envelope, MalformedTagError, MatchMode, Message, PayloadType, Tag};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use crate::config::{BusConfig, ErrorPolicy};
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::{AggregateError, BroadcastError, ListenerErrorKind, ListenerFailure};
use crate::handle::{ListenerGuard, ListenerHandle};
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::registry::{ChannelRegistry, ListenerCallback};
use crate::stream::MessageStream;

/// Hierarchical-tag publish/subscribe bus.
pub struct MessageBus {
    registry: Arc<ChannelRegistry>,
    config: BusConfig,
    metrics: Arc<dyn MetricsRecorder>,
}

impl MessageBus {
    /// Create a bus with default configuration and no metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self::with_metrics(config, Arc::new(NoOpMetrics))
    }

    /// Create a bus that reports into `metrics`.
    #[must_use]
    pub fn with_metrics(config: BusConfig, metrics: Arc<dyn MetricsRecorder>) -> Self {
        let registry = Arc::new(ChannelRegistry::with_metrics(Arc::clone(&metrics)));
        trace!(bus = %config.name, registry = %registry.id(), "Message bus created");
        Self {
            registry,
            config,
            metrics,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a listener for payloads of type `T` on `tag`.
    ///
    /// The callback receives the tag the message was actually broadcast on,
    /// which differs from `tag` for [`MatchMode::InclusiveAncestors`]
    /// listeners receiving a descendant's message.
    pub fn register<T, F>(&self, tag: &Tag, match_mode: MatchMode, callback: F) -> ListenerHandle
    where
        T: Message,
        F: Fn(&Tag, &T) + Send + Sync + 'static,
    {
        self.register_fallible::<T, _>(tag, match_mode, move |channel, payload| {
            callback(channel, payload);
            Ok(())
        })
    }

    /// Like [`register`](Self::register), but the callback can report a
    /// failure. Failures are collected into the broadcast's
    /// [`AggregateError`] and never stop other listeners.
    pub fn register_fallible<T, F>(
        &self,
        tag: &Tag,
        match_mode: MatchMode,
        callback: F,
    ) -> ListenerHandle
    where
        T: Message,
        F: Fn(&Tag, &T) -> Result<(), ListenerFailure> + Send + Sync + 'static,
    {
        let erased: ListenerCallback = Box::new(move |envelope| {
            match envelope.downcast_ref::<T>() {
                Some(payload) => callback(envelope.tag(), payload),
                None => Err(format!(
                    "expected payload of type {}, got {}",
                    type_name::<T>(),
                    envelope.payload_type().name()
                )
                .into()),
            }
        });
        self.registry
            .register(tag, Some(PayloadType::of::<T>()), match_mode, erased)
    }

    /// Register a listener that accepts every payload type.
    ///
    /// The callback gets the raw [`Envelope`] and inspects it with
    /// [`Envelope::is`] / [`Envelope::downcast_ref`].
    pub fn register_any<F>(&self, tag: &Tag, match_mode: MatchMode, callback: F) -> ListenerHandle
    where
        F: Fn(&Envelope<'_>) -> Result<(), ListenerFailure> + Send + Sync + 'static,
    {
        self.registry
            .register(tag, None, match_mode, Box::new(callback))
    }

    /// Parse `tag` and register. Nothing is registered if parsing fails.
    pub fn register_str<T, F>(
        &self,
        tag: &str,
        match_mode: MatchMode,
        callback: F,
    ) -> Result<ListenerHandle, MalformedTagError>
    where
        T: Message,
        F: Fn(&Tag, &T) + Send + Sync + 'static,
    {
        let tag = Tag::parse(tag)?;
        Ok(self.register::<T, F>(&tag, match_mode, callback))
    }

    /// Register and wrap the handle in a guard that unregisters on drop.
    pub fn register_guarded<T, F>(&self, tag: &Tag, match_mode: MatchMode, callback: F) -> ListenerGuard
    where
        T: Message,
        F: Fn(&Tag, &T) + Send + Sync + 'static,
    {
        let handle = self.register::<T, F>(tag, match_mode, callback);
        self.guard(handle)
    }

    /// Wrap an existing handle in a [`ListenerGuard`].
    pub fn guard(&self, handle: ListenerHandle) -> ListenerGuard {
        ListenerGuard::new(Arc::downgrade(&self.registry), handle)
    }

    /// Remove a listener. Stale, foreign, or repeated handles are ignored.
    pub fn unregister(&self, handle: &ListenerHandle) {
        self.registry.unregister(handle);
    }

    /// Receive matching `T` payloads asynchronously.
    ///
    /// Every matching broadcast queues a clone of the payload together with
    /// the broadcast tag. The listener is removed when the stream is dropped.
    pub fn listen<T>(&self, tag: &Tag, match_mode: MatchMode) -> MessageStream<T>
    where
        T: Message + Clone,
    {
        let (sender, receiver) = mpsc::unbounded_channel::<(Tag, T)>();
        let handle = self.register::<T, _>(tag, match_mode, move |channel, payload| {
            if sender.send((channel.clone(), payload.clone())).is_err() {
                trace!(tag = %channel, "Message stream receiver gone, dropping payload");
            }
        });
        MessageStream::new(self.guard(handle), receiver)
    }

    // =========================================================================
    // Broadcast
    // =========================================================================

    /// Deliver `payload` to every listener matching `tag`.
    ///
    /// Every matching listener is visited exactly once whatever the others
    /// do. Under [`ErrorPolicy::Aggregate`] the failures come back as one
    /// [`AggregateError`]; under [`ErrorPolicy::Log`] they are logged and
    /// this returns `Ok(())`.
    pub fn broadcast<T: Message>(&self, tag: &Tag, payload: &T) -> Result<(), AggregateError> {
        let report = self.broadcast_report(tag, payload);
        self.apply_policy(report)
    }

    /// Parse `tag` and broadcast. Nothing is delivered if parsing fails.
    pub fn broadcast_str<T: Message>(&self, tag: &str, payload: &T) -> Result<(), BroadcastError> {
        let tag = Tag::parse(tag)?;
        Ok(self.broadcast(&tag, payload)?)
    }

    /// Broadcast an already-erased payload.
    pub fn broadcast_dyn(&self, tag: &Tag, payload: &dyn Message) -> Result<(), AggregateError> {
        let report = self.dispatch(&Envelope::from_dyn(tag, payload));
        self.apply_policy(report)
    }

    /// Broadcast and return the full report, ignoring the error policy.
    pub fn broadcast_report<T: Message>(&self, tag: &Tag, payload: &T) -> DispatchReport {
        self.dispatch(&Envelope::new(tag, payload))
    }

    fn dispatch(&self, envelope: &Envelope<'_>) -> DispatchReport {
        if self.config.log_messages {
            info!(
                bus = %self.config.name,
                tag = %envelope.tag(),
                payload_type = envelope.payload_type().name(),
                payload = ?envelope.payload(),
                "Broadcasting message"
            );
        }

        Dispatcher::new(&self.registry)
            .with_metrics(self.metrics.as_ref())
            .catch_panics(self.config.catch_panics)
            .dispatch(envelope)
    }

    fn apply_policy(&self, report: DispatchReport) -> Result<(), AggregateError> {
        match self.config.error_policy {
            ErrorPolicy::Aggregate => report.into_result(),
            ErrorPolicy::Log => {
                for err in report.errors() {
                    // Mismatches were already logged by the dispatcher.
                    if err.kind() != ListenerErrorKind::TypeMismatch {
                        warn!(
                            bus = %self.config.name,
                            tag = %err.tag(),
                            handle = %err.handle(),
                            kind = err.kind().as_str(),
                            error = %err,
                            "Listener failed"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Introspection & teardown
    // =========================================================================

    /// Listeners registered under exactly `tag`.
    #[must_use]
    pub fn listener_count(&self, tag: &Tag) -> usize {
        self.registry.listener_count(tag)
    }

    /// Tags with at least one listener.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Remove every listener. Outstanding handles and guards become no-ops
    /// and open message streams end.
    pub fn clear(&self) {
        self.registry.clear();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("name", &self.config.name)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
