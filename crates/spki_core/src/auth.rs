//! Authorizations: a tag plus the right to re-delegate it.

use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A permission and whether its holder may delegate it further
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Auth {
    /// What is granted
    pub tag: Tag,
    /// Whether the subject may pass the grant on
    pub propagate: bool,
}

impl Auth {
    /// Create an authorization
    #[must_use]
    pub fn new(tag: Tag, propagate: bool) -> Self {
        Self { tag, propagate }
    }

    /// An authorization without delegation rights never implies one that
    /// carries them.
    #[must_use]
    pub fn implies(&self, other: &Auth) -> bool {
        (self.propagate || !other.propagate) && self.tag.implies(&other.tag)
    }
}

impl fmt::Display for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.propagate {
            write!(f, "(propagate) ")?;
        }
        write!(f, "(tag {})", self.tag)
    }
}
