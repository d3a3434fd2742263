//! # Listener Handles
//!
//! A [`ListenerHandle`] is a revocable token: it owns nothing, it only
//! authorizes one removal-by-identity. Holding a handle never keeps a
//! listener alive, and passing a stale handle to `unregister` is always a
//! safe no-op.
//!
//! [`ListenerGuard`] is the RAII flavour: it unregisters on drop.

use std::fmt;
use std::sync::Weak;

use message_types::Tag;
use uuid::Uuid;

use crate::registry::ChannelRegistry;

/// Opaque identity of one registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    /// Registry that issued the handle.
    registry: Uuid,
    /// Tag the listener was registered under.
    tag: Tag,
    /// Unique within the issuing registry; never reused.
    id: u64,
}

impl ListenerHandle {
    pub(crate) fn new(registry: Uuid, tag: Tag, id: u64) -> Self {
        Self { registry, tag, id }
    }

    /// Tag the listener was registered under.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Numeric id, unique within the issuing registry.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Id of the registry that issued this handle.
    #[must_use]
    pub fn registry_id(&self) -> Uuid {
        self.registry
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tag, self.id)
    }
}

/// Unregisters its listener when dropped.
///
/// Only a weak reference to the registry is held, so a guard outliving its
/// bus is harmless.
#[must_use = "dropping the guard unregisters the listener immediately"]
pub struct ListenerGuard {
    registry: Weak<ChannelRegistry>,
    handle: Option<ListenerHandle>,
}

impl ListenerGuard {
    pub(crate) fn new(registry: Weak<ChannelRegistry>, handle: ListenerHandle) -> Self {
        Self {
            registry,
            handle: Some(handle),
        }
    }

    /// The guarded handle, `None` once unregistered or detached.
    #[must_use]
    pub fn handle(&self) -> Option<&ListenerHandle> {
        self.handle.as_ref()
    }

    /// Unregister now. Calling this more than once is a no-op.
    pub fn unregister(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&handle);
        }
    }

    /// Detach: the listener stays registered and the plain handle is
    /// returned.
    #[must_use]
    pub fn into_handle(mut self) -> Option<ListenerHandle> {
        self.handle.take()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("handle", &self.handle)
            .field("registry_alive", &(self.registry.strong_count() > 0))
            .finish()
    }
}
