//! # Message Types Crate
//!
//! Value types used across the message router.
//!
//! ## Contents
//!
//! - **`Tag`**: hierarchical, dot-delimited channel identifier
//!   (`Combat.Damage.Taken`) with ancestor enumeration.
//! - **`MatchMode`**: how a listener's tag is compared to a broadcast tag.
//! - **`PayloadType`** / **`Message`**: runtime type witness carried next to
//!   an erased payload.
//! - **`Envelope`**: the tag + payload + type triple handed to listeners.
//!
//! ## Design Principles
//!
//! - **Value semantics**: tags are immutable and cheap to clone; no registry
//!   owns them and interning is not required for correctness.
//! - **Errors at construction**: a malformed tag fails when it is parsed,
//!   never later during a broadcast.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod envelope;
pub mod errors;
pub mod match_mode;
pub mod tag;

pub use envelope::{Envelope, Message, PayloadType};
pub use errors::MalformedTagError;
pub use match_mode::MatchMode;
pub use tag::{Tag, TAG_SEPARATOR};
