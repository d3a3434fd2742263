//! # Error Types
//!
//! Errors raised while constructing message types.

use thiserror::Error;

/// A tag string or segment list could not be turned into a [`Tag`](crate::Tag).
///
/// Raised synchronously by the constructor; nothing downstream ever sees a
/// half-built tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTagError {
    /// The input had no characters (or no segments at all).
    #[error("Malformed tag: tag is empty")]
    Empty,

    /// Two separators were adjacent, or the input started/ended with one.
    #[error("Malformed tag: '{input}' has an empty segment at position {position}")]
    EmptySegment { input: String, position: usize },

    /// A programmatically supplied segment contained the separator itself.
    #[error("Malformed tag: segment '{segment}' contains the separator '.'")]
    SeparatorInSegment { segment: String },
}

impl MalformedTagError {
    /// The offending input, when one is available.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::EmptySegment { input, .. } => Some(input),
            Self::SeparatorInSegment { segment } => Some(segment),
        }
    }
}
