//! Validity constraints: a time window plus opaque online-test obligations.
//!
//! A missing validity (`None`) is the universal element: it holds always.
//! Online tests are carried and compared, never executed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of online check a certificate depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineTestKind {
    /// Certificate revocation list
    Crl,
    /// Revalidation
    Reval,
    /// One-time use
    OneTime,
}

/// An online-test descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OnlineTest {
    /// What kind of check
    pub kind: OnlineTestKind,
    /// Where the check would be performed
    pub uri: String,
}

impl OnlineTest {
    /// Create an online test
    #[must_use]
    pub fn new(kind: OnlineTestKind, uri: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
        }
    }
}

/// Conditions under which a statement holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Validity {
    /// Earliest instant the statement holds
    pub not_before: Option<DateTime<Utc>>,
    /// Latest instant the statement holds
    pub not_after: Option<DateTime<Utc>>,
    /// Online tests that must also pass
    #[serde(default)]
    pub online_tests: BTreeSet<OnlineTest>,
}

impl Validity {
    /// An unconstrained validity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the not-before bound
    #[must_use]
    pub fn with_not_before(mut self, t: DateTime<Utc>) -> Self {
        self.not_before = Some(t);
        self
    }

    /// Set the not-after bound
    #[must_use]
    pub fn with_not_after(mut self, t: DateTime<Utc>) -> Self {
        self.not_after = Some(t);
        self
    }

    /// Add an online test
    #[must_use]
    pub fn with_online_test(mut self, test: OnlineTest) -> Self {
        self.online_tests.insert(test);
        self
    }

    /// Tightest bounds of both, union of tests
    #[must_use]
    pub fn intersect(&self, other: &Validity) -> Validity {
        let not_before = match (self.not_before, other.not_before) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let not_after = match (self.not_after, other.not_after) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Validity {
            not_before,
            not_after,
            online_tests: self.online_tests.union(&other.online_tests).cloned().collect(),
        }
    }

    /// Whether this validity holds whenever `other` does
    #[must_use]
    pub fn holds_whenever(&self, other: &Validity) -> bool {
        let before_ok = match (self.not_before, other.not_before) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a <= b,
        };
        let after_ok = match (self.not_after, other.not_after) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(a), Some(b)) => a >= b,
        };
        before_ok && after_ok && self.online_tests.is_subset(&other.online_tests)
    }

    /// Whether the time window contains `at`. Online tests are not run.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.not_before.is_none_or(|nb| nb <= at) && self.not_after.is_none_or(|na| at <= na)
    }

    /// Whether the window is empty (not-before later than not-after)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.not_before, self.not_after), (Some(nb), Some(na)) if nb > na)
    }

    /// `v1` implies `v2`: `v1` holds whenever `v2` does. `None` holds always.
    #[must_use]
    pub fn implies(v1: Option<&Validity>, v2: Option<&Validity>) -> bool {
        match (v1, v2) {
            (None, _) => true,
            (Some(a), None) => a.holds_whenever(&Validity::default()),
            (Some(a), Some(b)) => a.holds_whenever(b),
        }
    }

    /// Intersection where `None` is the identity
    #[must_use]
    pub fn intersect_opt(v1: Option<&Validity>, v2: Option<&Validity>) -> Option<Validity> {
        match (v1, v2) {
            (None, None) => None,
            (Some(v), None) | (None, Some(v)) => Some(v.clone()),
            (Some(a), Some(b)) => Some(a.intersect(b)),
        }
    }
}
