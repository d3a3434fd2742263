//! Cross-crate integration scenarios.

pub mod concurrency;
pub mod reentrancy;
pub mod streams;
pub mod telemetry;

use message_types::Tag;

/// Payload used across scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
}

impl Notice {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

/// Combat payload used across scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    pub amount: u32,
}

/// Parse a tag that is known to be well formed.
pub fn tag(s: &str) -> Tag {
    match Tag::parse(s) {
        Ok(tag) => tag,
        Err(e) => panic!("test tag {s:?} is malformed: {e}"),
    }
}
