//! # Error Types
//!
//! Dispatch never stops at the first failing listener. Each failure is
//! captured as a [`ListenerError`] and, once the pass is over, handed back to
//! the broadcaster inside an [`AggregateError`].

use message_types::{MalformedTagError, PayloadType, Tag};
use thiserror::Error;

use crate::handle::ListenerHandle;

/// Error type listener callbacks may return.
pub type ListenerFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A single listener failed during one broadcast.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener expects a different payload type than was broadcast.
    /// The listener was skipped.
    #[error(
        "Payload type mismatch on '{tag}': listener {handle} on '{listener_tag}' expects {expected}, broadcast carried {actual}"
    )]
    PayloadTypeMismatch {
        tag: Tag,
        listener_tag: Tag,
        handle: ListenerHandle,
        expected: PayloadType,
        actual: PayloadType,
    },

    /// The listener's callback returned an error.
    #[error("Listener {handle} failed on '{tag}': {source}")]
    Invocation {
        tag: Tag,
        handle: ListenerHandle,
        #[source]
        source: ListenerFailure,
    },

    /// The listener's callback panicked. The panic was contained.
    #[error("Listener {handle} panicked on '{tag}': {message}")]
    Panicked {
        tag: Tag,
        handle: ListenerHandle,
        message: String,
    },
}

impl ListenerError {
    /// Handle of the listener that failed.
    #[must_use]
    pub fn handle(&self) -> &ListenerHandle {
        match self {
            Self::PayloadTypeMismatch { handle, .. }
            | Self::Invocation { handle, .. }
            | Self::Panicked { handle, .. } => handle,
        }
    }

    /// Broadcast tag the failure happened on.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        match self {
            Self::PayloadTypeMismatch { tag, .. }
            | Self::Invocation { tag, .. }
            | Self::Panicked { tag, .. } => tag,
        }
    }

    /// Coarse classification, used for metrics labels.
    #[must_use]
    pub fn kind(&self) -> ListenerErrorKind {
        match self {
            Self::PayloadTypeMismatch { .. } => ListenerErrorKind::TypeMismatch,
            Self::Invocation { .. } => ListenerErrorKind::Invocation,
            Self::Panicked { .. } => ListenerErrorKind::Panicked,
        }
    }

    /// `true` for a payload type contract violation.
    #[must_use]
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::PayloadTypeMismatch { .. })
    }
}

/// Classification of [`ListenerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerErrorKind {
    TypeMismatch,
    Invocation,
    Panicked,
}

impl ListenerErrorKind {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypeMismatch => "type_mismatch",
            Self::Invocation => "invocation",
            Self::Panicked => "panicked",
        }
    }
}

/// Every listener error collected during one broadcast, in invocation order.
#[derive(Debug, Error)]
#[error("{} listener error(s) while broadcasting on '{tag}'", .errors.len())]
pub struct AggregateError {
    tag: Tag,
    errors: Vec<ListenerError>,
}

impl AggregateError {
    pub(crate) fn new(tag: Tag, errors: Vec<ListenerError>) -> Self {
        Self { tag, errors }
    }

    /// The broadcast tag.
    #[must_use]
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// The collected errors, in the order the listeners were visited.
    #[must_use]
    pub fn errors(&self) -> &[ListenerError] {
        &self.errors
    }

    /// Take ownership of the collected errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<ListenerError> {
        self.errors
    }

    /// Number of failed listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false` for an error returned by the bus.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors of one kind only.
    pub fn of_kind(&self, kind: ListenerErrorKind) -> impl Iterator<Item = &ListenerError> {
        self.errors.iter().filter(move |e| e.kind() == kind)
    }
}

/// Errors from the string-tag broadcast convenience API.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The tag string did not parse; nothing was delivered.
    #[error(transparent)]
    MalformedTag(#[from] MalformedTagError),

    /// Delivery happened but one or more listeners failed.
    #[error(transparent)]
    Listeners(#[from] AggregateError),
}

/// Errors while loading a [`BusConfig`](crate::config::BusConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid bus configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid error policy: {0} (expected 'aggregate' or 'log')")]
    InvalidErrorPolicy(String),
}

/// Errors from [`MessageStream`](crate::stream::MessageStream).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The listener behind the stream was removed (unregistered or the
    /// registry was cleared) and no more messages will arrive.
    #[error("Message stream closed")]
    Closed,
}
