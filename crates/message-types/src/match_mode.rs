//! Listener match rules.

use serde::{Deserialize, Serialize};

use crate::tag::Tag;

/// How a listener's registration tag is compared with a broadcast tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Only broadcasts on exactly the registered tag.
    /// Registering `A.B` receives `A.B` but not `A.B.C`.
    #[default]
    Exact,

    /// Broadcasts on the registered tag or any tag below it.
    /// Registering `A.B` receives `A.B` and `A.B.C`.
    InclusiveAncestors,
}

impl MatchMode {
    /// Whether a listener registered on `registered` receives a broadcast on
    /// `broadcast`.
    #[must_use]
    pub fn matches(self, registered: &Tag, broadcast: &Tag) -> bool {
        match self {
            Self::Exact => registered == broadcast,
            Self::InclusiveAncestors => registered.is_ancestor_of(broadcast),
        }
    }
}
