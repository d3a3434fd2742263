//! # Payload Envelope
//!
//! The bus is payload-type agnostic: listeners are stored behind an erased
//! interface and payloads travel as `&dyn Message`. The [`PayloadType`]
//! witness travels with every payload and every typed registration so the
//! dispatcher can check the contract before a listener sees the data.
//!
//! An [`Envelope`] borrows both the tag and the payload; it is built right
//! before a broadcast and dropped when the broadcast returns.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::tag::Tag;

/// Runtime identity of a payload type.
///
/// Equality and hashing use the [`TypeId`] only; the name is kept for logs
/// and error messages.
#[derive(Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    /// Witness for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Rust type name, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `true` if this witnesses `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl Hash for PayloadType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadType({})", self.name)
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Anything that can be broadcast.
///
/// Implemented for every `'static + Send + Sync + Debug` type; `Debug` is
/// what the bus prints when message logging is enabled.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Witness of the concrete type.
    fn payload_type(&self) -> PayloadType;
}

impl<T: Any + Send + Sync + fmt::Debug> Message for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn payload_type(&self) -> PayloadType {
        PayloadType::of::<T>()
    }
}

/// A borrowed, type-tagged payload on its way to listeners.
#[derive(Clone, Copy)]
pub struct Envelope<'a> {
    tag: &'a Tag,
    payload: &'a dyn Message,
    payload_type: PayloadType,
}

impl<'a> Envelope<'a> {
    /// Wrap `payload` for a broadcast on `tag`.
    #[must_use]
    pub fn new<T: Message>(tag: &'a Tag, payload: &'a T) -> Self {
        Self {
            tag,
            payload,
            payload_type: PayloadType::of::<T>(),
        }
    }

    /// Wrap an already-erased payload.
    #[must_use]
    pub fn from_dyn(tag: &'a Tag, payload: &'a dyn Message) -> Self {
        Self {
            tag,
            payload,
            payload_type: payload.payload_type(),
        }
    }

    /// The tag the payload was broadcast on.
    #[must_use]
    pub fn tag(&self) -> &'a Tag {
        self.tag
    }

    /// Runtime type of the payload.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// The erased payload.
    #[must_use]
    pub fn payload(&self) -> &'a dyn Message {
        self.payload
    }

    /// `true` if the payload is a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.payload_type.is::<T>()
    }

    /// Typed view of the payload, or `None` if it is not a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        let payload: &'a dyn Message = self.payload;
        (*payload).as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Envelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("tag", &self.tag.as_str())
            .field("payload_type", &self.payload_type.name())
            .field("payload", &self.payload)
            .finish()
    }
}
