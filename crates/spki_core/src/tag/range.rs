//! Range tags: intervals of strings under one of five total orders.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

const TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The total order a range is evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOrdering {
    /// Lexicographic over characters
    Alpha,
    /// Decimal numbers
    Numeric,
    /// `YYYY-MM-DD_HH:MM:SS` timestamps
    Time,
    /// `YYYY-MM-DD` dates
    Date,
    /// Hex-encoded byte strings, compared bytewise
    Binary,
}

impl RangeOrdering {
    /// Compare two values under this order.
    ///
    /// Returns `None` when either value does not convert.
    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Option<Ordering> {
        match self {
            Self::Alpha => Some(a.cmp(b)),
            Self::Numeric => {
                let a: f64 = a.trim().parse().ok()?;
                let b: f64 = b.trim().parse().ok()?;
                a.partial_cmp(&b)
            }
            Self::Time => {
                let a = NaiveDateTime::parse_from_str(a, TIME_FORMAT).ok()?;
                let b = NaiveDateTime::parse_from_str(b, TIME_FORMAT).ok()?;
                Some(a.cmp(&b))
            }
            Self::Date => {
                let a = NaiveDate::parse_from_str(a, DATE_FORMAT).ok()?;
                let b = NaiveDate::parse_from_str(b, DATE_FORMAT).ok()?;
                Some(a.cmp(&b))
            }
            Self::Binary => {
                let a = hex::decode(a).ok()?;
                let b = hex::decode(b).ok()?;
                Some(a.cmp(&b))
            }
        }
    }

    /// Whether `value` converts under this order
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        self.compare(value, value).is_some()
    }

    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Alpha => "alpha",
            Self::Numeric => "numeric",
            Self::Time => "time",
            Self::Date => "date",
            Self::Binary => "binary",
        }
    }
}

/// One end of a range
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeBound {
    /// Bound value, in the range's encoding
    pub value: String,
    /// Whether the bound value itself is inside the range
    pub inclusive: bool,
}

impl RangeBound {
    /// Create a bound
    #[must_use]
    pub fn new(value: impl Into<String>, inclusive: bool) -> Self {
        Self {
            value: value.into(),
            inclusive,
        }
    }
}

/// A bounded interval; either bound may be open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeTag {
    /// Order the bounds and candidates are compared under
    pub ordering: RangeOrdering,
    /// Lower bound, if any
    pub lower: Option<RangeBound>,
    /// Upper bound, if any
    pub upper: Option<RangeBound>,
}

impl RangeTag {
    /// Create an unbounded range
    #[must_use]
    pub fn new(ordering: RangeOrdering) -> Self {
        Self {
            ordering,
            lower: None,
            upper: None,
        }
    }

    /// Set an inclusive lower bound
    #[must_use]
    pub fn ge(mut self, value: impl Into<String>) -> Self {
        self.lower = Some(RangeBound::new(value, true));
        self
    }

    /// Set a strict lower bound
    #[must_use]
    pub fn gt(mut self, value: impl Into<String>) -> Self {
        self.lower = Some(RangeBound::new(value, false));
        self
    }

    /// Set an inclusive upper bound
    #[must_use]
    pub fn le(mut self, value: impl Into<String>) -> Self {
        self.upper = Some(RangeBound::new(value, true));
        self
    }

    /// Set a strict upper bound
    #[must_use]
    pub fn lt(mut self, value: impl Into<String>) -> Self {
        self.upper = Some(RangeBound::new(value, false));
        self
    }

    /// Whether `value` lies inside the range. Values (or bounds) that do not
    /// convert under the ordering are outside.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        let above_lower = match &self.lower {
            None => self.ordering.accepts(value),
            Some(bound) => match self.ordering.compare(value, &bound.value) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => bound.inclusive,
                Some(Ordering::Less) | None => false,
            },
        };
        let below_upper = match &self.upper {
            None => true,
            Some(bound) => match self.ordering.compare(value, &bound.value) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => bound.inclusive,
                Some(Ordering::Greater) | None => false,
            },
        };
        above_lower && below_upper
    }

    /// Bound-wise meet of two ranges. `None` if the orders differ, a bound
    /// does not convert, or the result is empty.
    #[must_use]
    pub fn meet(&self, other: &RangeTag) -> Option<RangeTag> {
        if self.ordering != other.ordering {
            return None;
        }
        let lower = self.tighter(&self.lower, &other.lower, Ordering::Greater)?;
        let upper = self.tighter(&self.upper, &other.upper, Ordering::Less)?;

        if let (Some(lo), Some(hi)) = (&lower, &upper) {
            match self.ordering.compare(&lo.value, &hi.value)? {
                Ordering::Greater => return None,
                Ordering::Equal if !(lo.inclusive && hi.inclusive) => return None,
                _ => {}
            }
        }

        Some(RangeTag {
            ordering: self.ordering,
            lower,
            upper,
        })
    }

    /// Pick the more restrictive of two bounds; `wins` is the ordering of
    /// `a` relative to `b` under which `a` is the tighter one.
    fn tighter(
        &self,
        a: &Option<RangeBound>,
        b: &Option<RangeBound>,
        wins: Ordering,
    ) -> Option<Option<RangeBound>> {
        let bound = match (a, b) {
            (None, None) => return Some(None),
            (Some(x), None) | (None, Some(x)) => {
                if !self.ordering.accepts(&x.value) {
                    return None;
                }
                x.clone()
            }
            (Some(x), Some(y)) => match self.ordering.compare(&x.value, &y.value)? {
                Ordering::Equal => RangeBound {
                    value: x.value.clone().min(y.value.clone()),
                    inclusive: x.inclusive && y.inclusive,
                },
                ord if ord == wins => x.clone(),
                _ => y.clone(),
            },
        };
        Some(Some(bound))
    }
}

impl fmt::Display for RangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(* range {}", self.ordering.as_str())?;
        if let Some(lo) = &self.lower {
            write!(f, " {} {}", if lo.inclusive { "ge" } else { "g" }, lo.value)?;
        }
        if let Some(hi) = &self.upper {
            write!(f, " {} {}", if hi.inclusive { "le" } else { "l" }, hi.value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_contains() {
        let r = RangeTag::new(RangeOrdering::Alpha).ge("read").le("write");
        assert!(r.contains("read"));
        assert!(r.contains("update"));
        assert!(r.contains("write"));
        assert!(!r.contains("zzz"));
        assert!(!r.contains("aaa"));
    }

    #[test]
    fn test_strict_bounds() {
        let r = RangeTag::new(RangeOrdering::Numeric).gt("1").lt("10");
        assert!(!r.contains("1"));
        assert!(r.contains("1.5"));
        assert!(!r.contains("10"));
        assert!(!r.contains("ten"));
    }

    #[test]
    fn test_numeric_meet() {
        let a = RangeTag::new(RangeOrdering::Numeric).ge("0").le("100");
        let b = RangeTag::new(RangeOrdering::Numeric).gt("50");
        let m = a.meet(&b).unwrap();
        assert_eq!(m, RangeTag::new(RangeOrdering::Numeric).gt("50").le("100"));
        assert_eq!(b.meet(&a), Some(m));
    }

    #[test]
    fn test_meet_empty_and_touching() {
        let a = RangeTag::new(RangeOrdering::Numeric).le("5");
        let b = RangeTag::new(RangeOrdering::Numeric).ge("5");
        assert_eq!(
            a.meet(&b),
            Some(RangeTag::new(RangeOrdering::Numeric).ge("5").le("5"))
        );

        let c = RangeTag::new(RangeOrdering::Numeric).gt("5");
        assert_eq!(a.meet(&c), None);

        let d = RangeTag::new(RangeOrdering::Numeric).ge("6");
        assert_eq!(a.meet(&d), None);
    }

    #[test]
    fn test_meet_mismatched_orders() {
        let a = RangeTag::new(RangeOrdering::Alpha).ge("a");
        let b = RangeTag::new(RangeOrdering::Numeric).ge("1");
        assert_eq!(a.meet(&b), None);
    }

    #[test]
    fn test_bad_bound_fails_safe() {
        let bad = RangeTag::new(RangeOrdering::Date).ge("yesterday");
        let good = RangeTag::new(RangeOrdering::Date).le("2024-01-01");
        assert_eq!(bad.meet(&good), None);
        assert!(!bad.contains("2023-01-01"));
    }

    #[test]
    fn test_time_and_date_orders() {
        let t = RangeTag::new(RangeOrdering::Time)
            .ge("2024-01-01_00:00:00")
            .lt("2024-02-01_00:00:00");
        assert!(t.contains("2024-01-15_12:30:00"));
        assert!(!t.contains("2024-02-01_00:00:00"));

        let d = RangeTag::new(RangeOrdering::Date).ge("2024-01-01");
        assert!(d.contains("2024-06-30"));
        assert!(!d.contains("2023-12-31"));
    }

    #[test]
    fn test_binary_order() {
        let r = RangeTag::new(RangeOrdering::Binary).ge("00ff").le("0100");
        assert!(r.contains("00ff"));
        assert!(r.contains("01"));
        assert!(!r.contains("02"));
        assert!(!r.contains("xyz"));
    }

    #[test]
    fn test_display() {
        let r = RangeTag::new(RangeOrdering::Alpha).ge("a").lt("m");
        assert_eq!(r.to_string(), "(* range alpha ge a l m)");
    }
}
