//! # Channel Tags
//!
//! A [`Tag`] is a hierarchical channel identifier made of case-sensitive
//! segments joined by [`TAG_SEPARATOR`]:
//!
//! ```text
//! Combat.Damage.Taken
//! ├── depth 3: Combat.Damage.Taken   (the tag itself)
//! ├── depth 2: Combat.Damage
//! └── depth 1: Combat                (root segment)
//! ```
//!
//! Tags are values. Two tags are equal iff their segment sequences are equal,
//! which for well-formed tags is the same as comparing canonical strings, so
//! equality, hashing and ordering all work on the canonical form.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::MalformedTagError;

/// Separator between tag segments.
pub const TAG_SEPARATOR: char = '.';

/// Hierarchical channel identifier.
///
/// Cloning is cheap: the canonical string and segment boundaries are shared.
#[derive(Clone)]
pub struct Tag {
    /// Canonical dotted form, e.g. `Combat.Damage`.
    canonical: Arc<str>,
    /// Exclusive byte offset of the end of each segment in `canonical`.
    /// Always non-empty; the last entry equals `canonical.len()`.
    ends: Arc<[usize]>,
}

impl Tag {
    /// Parse a canonical tag string.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedTagError`] if the string is empty or any segment is
    /// empty (`"A..B"`, `".A"`, `"A."`).
    pub fn parse(input: &str) -> Result<Self, MalformedTagError> {
        if input.is_empty() {
            return Err(MalformedTagError::Empty);
        }

        let mut ends = Vec::new();
        let mut offset = 0;
        for (position, segment) in input.split(TAG_SEPARATOR).enumerate() {
            if segment.is_empty() {
                return Err(MalformedTagError::EmptySegment {
                    input: input.to_string(),
                    position,
                });
            }
            offset += segment.len();
            ends.push(offset);
            offset += TAG_SEPARATOR.len_utf8();
        }

        Ok(Self {
            canonical: Arc::from(input),
            ends: Arc::from(ends),
        })
    }

    /// Build a tag from individual segments.
    ///
    /// # Errors
    ///
    /// Fails if there are no segments, a segment is empty, or a segment
    /// contains the separator.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, MalformedTagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut canonical = String::new();
        for (position, segment) in segments.into_iter().enumerate() {
            let segment = segment.as_ref();
            if segment.is_empty() {
                return Err(MalformedTagError::EmptySegment {
                    input: canonical,
                    position,
                });
            }
            if segment.contains(TAG_SEPARATOR) {
                return Err(MalformedTagError::SeparatorInSegment {
                    segment: segment.to_string(),
                });
            }
            if position > 0 {
                canonical.push(TAG_SEPARATOR);
            }
            canonical.push_str(segment);
        }
        Self::parse(&canonical)
    }

    /// Canonical dotted form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ends.len()
    }

    /// Iterate the segments from root to leaf.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.canonical.split(TAG_SEPARATOR)
    }

    /// The root segment alone, as a tag of depth 1.
    #[must_use]
    pub fn root(&self) -> Tag {
        self.truncate(1)
    }

    /// The direct parent, or `None` for a root tag.
    #[must_use]
    pub fn parent(&self) -> Option<Tag> {
        let depth = self.depth();
        (depth > 1).then(|| self.truncate(depth - 1))
    }

    /// The chain from this tag down to its root segment, most specific first.
    ///
    /// The result always has exactly [`depth`](Self::depth) elements, starts
    /// with `self` and ends with [`root`](Self::root).
    #[must_use]
    pub fn ancestors(&self) -> Vec<Tag> {
        (1..=self.depth()).rev().map(|d| self.truncate(d)).collect()
    }

    /// `true` if `self` is `other` or one of `other`'s ancestors, i.e. the
    /// segments of `self` are a prefix of the segments of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Tag) -> bool {
        let depth = self.depth();
        depth <= other.depth()
            && other.ends[depth - 1] == self.canonical.len()
            && other.canonical.starts_with(&*self.canonical)
    }

    /// `true` if `other` is `self` or one of `self`'s ancestors.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Tag) -> bool {
        other.is_ancestor_of(self)
    }

    /// Keep the first `depth` segments. `depth` must be in `1..=self.depth()`.
    fn truncate(&self, depth: usize) -> Tag {
        if depth == self.depth() {
            return self.clone();
        }
        let end = self.ends[depth - 1];
        Tag {
            canonical: Arc::from(&self.canonical[..end]),
            ends: Arc::from(&self.ends[..depth]),
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `str::hash` for the `Borrow<str>` impl.
        self.as_str().hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.canonical)
    }
}

impl FromStr for Tag {
    type Err = MalformedTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Tag {
    type Error = MalformedTagError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Tag {
    type Error = MalformedTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Tag::parse(&raw).map_err(de::Error::custom)
    }
}
