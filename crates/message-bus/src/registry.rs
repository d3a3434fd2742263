//! # Channel Registry
//!
//! Owns the mapping from exact tag to the ordered listeners registered under
//! it, and resolves a broadcast tag to the listeners that should see it.
//!
//! ## Resolution order
//!
//! ```text
//! broadcast Combat.Damage.Taken
//!   depth 0  Combat.Damage.Taken  every listener, registration order
//!   depth 1  Combat.Damage        InclusiveAncestors listeners only
//!   depth 2  Combat               InclusiveAncestors listeners only
//! ```
//!
//! More specific listeners always observe a message before more general ones.
//!
//! ## Locking
//!
//! One `parking_lot::Mutex` guards the whole map. [`ChannelRegistry::resolve`]
//! copies the matching records into an owned [`Snapshot`] and releases the
//! lock before returning, so callbacks run lock-free and may re-enter
//! `register`/`unregister`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use message_types::{Envelope, MatchMode, PayloadType, Tag};
use parking_lot::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::ListenerFailure;
use crate::handle::ListenerHandle;
use crate::metrics::{MetricsRecorder, NoOpMetrics};

/// Erased listener callback stored in the registry.
pub type ListenerCallback =
    Box<dyn Fn(&Envelope<'_>) -> Result<(), ListenerFailure> + Send + Sync + 'static>;

/// One registered listener.
///
/// Records are immutable after registration and shared by `Arc` with any
/// snapshot that captured them, so removing a record never invalidates a
/// dispatch already in flight.
pub struct ListenerRecord {
    handle: ListenerHandle,
    /// `None` accepts any payload type.
    expected: Option<PayloadType>,
    match_mode: MatchMode,
    callback: ListenerCallback,
}

impl ListenerRecord {
    /// The listener's handle.
    #[must_use]
    pub fn handle(&self) -> &ListenerHandle {
        &self.handle
    }

    /// Tag the listener was registered under.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        self.handle.tag()
    }

    /// Payload type the listener expects, `None` for untyped listeners.
    #[must_use]
    pub fn expected_type(&self) -> Option<PayloadType> {
        self.expected
    }

    /// Match mode chosen at registration.
    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// `true` if this listener accepts a payload of type `actual`.
    #[must_use]
    pub fn accepts(&self, actual: PayloadType) -> bool {
        self.expected.map_or(true, |expected| expected == actual)
    }

    pub(crate) fn invoke(&self, envelope: &Envelope<'_>) -> Result<(), ListenerFailure> {
        (self.callback)(envelope)
    }
}

impl fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("handle", &self.handle)
            .field("expected", &self.expected)
            .field("match_mode", &self.match_mode)
            .finish_non_exhaustive()
    }
}

/// Owned, ordered copy of the listeners matching one broadcast tag.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tag: Tag,
    listeners: Vec<Arc<ListenerRecord>>,
}

impl Snapshot {
    /// Broadcast tag this snapshot was resolved for.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Number of matching listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Records in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &ListenerRecord> {
        self.listeners.iter().map(Arc::as_ref)
    }

    /// Handles in dispatch order.
    #[must_use]
    pub fn handles(&self) -> Vec<ListenerHandle> {
        self.iter().map(|r| r.handle().clone()).collect()
    }
}

/// Listeners bound to one exact tag, in registration order.
#[derive(Default)]
struct ChannelEntry {
    listeners: Vec<Arc<ListenerRecord>>,
}

/// Tag → ordered listener list.
pub struct ChannelRegistry {
    id: Uuid,
    next_id: AtomicU64,
    channels: Mutex<HashMap<Tag, ChannelEntry>>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl ChannelRegistry {
    /// Create an empty registry with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(NoOpMetrics))
    }

    /// Create an empty registry that reports listener churn to `metrics`.
    #[must_use]
    pub fn with_metrics(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            id: Uuid::new_v4(),
            next_id: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Identity stamped into every handle this registry issues.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append a listener to `tag`'s list and return its handle.
    ///
    /// Registering the same callback twice yields two independent records.
    pub fn register(
        &self,
        tag: &Tag,
        expected: Option<PayloadType>,
        match_mode: MatchMode,
        callback: ListenerCallback,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = ListenerHandle::new(self.id, tag.clone(), id);
        let record = Arc::new(ListenerRecord {
            handle: handle.clone(),
            expected,
            match_mode,
            callback,
        });

        let listeners = {
            let mut channels = self.channels.lock();
            let entry = channels.entry(tag.clone()).or_default();
            entry.listeners.push(record);
            entry.listeners.len()
        };
        self.metrics.record_registered(tag);

        debug!(
            tag = %tag,
            handle = id,
            match_mode = ?match_mode,
            payload_type = expected.map_or("<any>", |t| t.name()),
            listeners,
            "Listener registered"
        );

        handle
    }

    /// Remove the listener identified by `handle`.
    ///
    /// Returns whether a record was removed. Unknown, stale, or foreign
    /// handles are ignored; this never fails and is safe to call from inside
    /// a listener.
    pub fn unregister(&self, handle: &ListenerHandle) -> bool {
        if handle.registry_id() != self.id {
            debug!(handle = %handle, "Ignoring handle issued by another registry");
            return false;
        }

        // The removed record is dropped after the lock is released: its
        // callback may own guards or streams that unregister on drop.
        let (removed_record, _emptied) = {
            let mut channels = self.channels.lock();
            let Some(entry) = channels.get_mut(handle.tag()) else {
                return false;
            };
            let removed = entry
                .listeners
                .iter()
                .position(|r| r.handle.id() == handle.id())
                // `remove`, not `swap_remove`: registration order is observable.
                .map(|index| entry.listeners.remove(index));
            let emptied = if entry.listeners.is_empty() {
                channels.remove(handle.tag())
            } else {
                None
            };
            (removed, emptied)
        };
        let removed = removed_record.is_some();

        if removed {
            self.metrics.record_unregistered(handle.tag());
            debug!(tag = %handle.tag(), handle = handle.id(), "Listener unregistered");
        }
        removed
    }

    /// Snapshot of the listeners that should receive a broadcast on `tag`,
    /// most specific tag first, registration order within each tag.
    #[must_use]
    pub fn resolve(&self, tag: &Tag) -> Snapshot {
        let chain = tag.ancestors();
        let mut listeners = Vec::new();
        {
            let channels = self.channels.lock();
            for (depth, ancestor) in chain.iter().enumerate() {
                let Some(entry) = channels.get(ancestor) else {
                    continue;
                };
                listeners.extend(
                    entry
                        .listeners
                        .iter()
                        .filter(|r| depth == 0 || r.match_mode == MatchMode::InclusiveAncestors)
                        .cloned(),
                );
            }
        }

        trace!(tag = %tag, listeners = listeners.len(), "Resolved listeners");

        Snapshot {
            tag: tag.clone(),
            listeners,
        }
    }

    /// Listeners registered under exactly `tag`.
    #[must_use]
    pub fn listener_count(&self, tag: &Tag) -> usize {
        self.channels
            .lock()
            .get(tag)
            .map_or(0, |entry| entry.listeners.len())
    }

    /// Tags with at least one listener.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// Listeners across all tags.
    #[must_use]
    pub fn total_listeners(&self) -> usize {
        self.channels
            .lock()
            .values()
            .map(|entry| entry.listeners.len())
            .sum()
    }

    /// `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.lock().is_empty()
    }

    /// Drop every listener. Outstanding handles become no-ops.
    pub fn clear(&self) {
        let dropped = {
            let mut channels = self.channels.lock();
            std::mem::take(&mut *channels)
        };
        for (tag, entry) in &dropped {
            for _ in &entry.listeners {
                self.metrics.record_unregistered(tag);
            }
        }
        debug!(channels = dropped.len(), "Registry cleared");
        // Records (and whatever their callbacks captured) drop here, outside
        // the lock.
        drop(dropped);
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("id", &self.id)
            .field("channels", &self.channel_count())
            .finish()
    }
}
