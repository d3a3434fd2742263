//! # Message Bus - Hierarchical-Tag Publish/Subscribe
//!
//! Decouples gameplay systems: senders broadcast typed messages under a
//! dotted channel tag, listeners registered on that tag (or on an ancestor,
//! depending on [`MatchMode`]) receive them without either side knowing the
//! other.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ HUD widget   │                    │ Damage system│
//! │              │  register(UI)      │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       ▼            └──────┬───────┘
//!                  ┌──────────────┐          │ broadcast(UI.Notify, &msg)
//!                  │  MessageBus  │ ◄────────┘
//!                  │  registry    │
//!                  │  dispatcher  │
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Ordering:** listeners on the broadcast tag run first, then listeners
//!   on each ancestor, registration order within a tag.
//! - **Re-entrancy:** callbacks may register, unregister, and broadcast.
//!   A pass works on a snapshot; listeners added during it are not part of it.
//! - **Type safety:** a listener whose payload type differs from the
//!   broadcast's is skipped and reported, never handed the wrong data.
//! - **Isolation:** a failing or panicking listener never stops the others.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod registry;
pub mod stream;

// Re-export main types
pub use bus::MessageBus;
pub use config::{BusConfig, ErrorPolicy};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{
    AggregateError, BroadcastError, ConfigError, ListenerError, ListenerErrorKind,
    ListenerFailure, StreamError,
};
pub use handle::{ListenerGuard, ListenerHandle};
pub use metrics::{Metrics, MetricsRecorder, MetricsSnapshot, NoOpMetrics};
pub use registry::{ChannelRegistry, ListenerCallback, ListenerRecord, Snapshot};
pub use stream::MessageStream;

pub use message_types::{Envelope, MalformedTagError, MatchMode, Message, PayloadType, Tag};

/// Name of a bus created without explicit configuration.
pub const DEFAULT_BUS_NAME: &str = "message-bus";
