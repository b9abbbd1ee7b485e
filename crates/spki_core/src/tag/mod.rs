//! Tags: the permission vocabulary of authorization certificates.
//!
//! Tags form a meet-semilattice under [`Tag::intersect`] with [`Tag::All`] as
//! the identity and [`Tag::Null`] as the absorbing element. Implication is
//! derived from intersection and never special-cased: `a` implies `b` exactly
//! when `a ∩ b == b`.

mod range;

pub use range::{RangeBound, RangeOrdering, RangeTag};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A permission predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Every permission, `(tag (*))`
    All,
    /// No permission; the result of a failed intersection, never serialized
    /// into a certificate
    Null,
    /// A concrete permission expression
    Expr(ExprTag),
}

/// The tag variants other than [`Tag::All`] and [`Tag::Null`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprTag {
    /// Exactly this string
    String(String),
    /// Every string starting with this prefix
    Prefix(String),
    /// Every string that is a prefix of this one
    ReversePrefix(String),
    /// Every string inside an ordered interval
    Range(RangeTag),
    /// Union of expressions
    Set(SetTag),
    /// A typed list of nested expressions
    Simple(SimpleTag),
}

impl Tag {
    /// The tag granting everything
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// The tag granting nothing
    #[must_use]
    pub const fn null() -> Self {
        Self::Null
    }

    /// An exact string tag
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::Expr(ExprTag::String(s.into()))
    }

    /// A prefix tag
    #[must_use]
    pub fn prefix(s: impl Into<String>) -> Self {
        Self::Expr(ExprTag::Prefix(s.into()))
    }

    /// A reverse-prefix tag
    #[must_use]
    pub fn reverse_prefix(s: impl Into<String>) -> Self {
        Self::Expr(ExprTag::ReversePrefix(s.into()))
    }

    /// A range tag
    #[must_use]
    pub fn range(range: RangeTag) -> Self {
        Self::Expr(ExprTag::Range(range))
    }

    /// A set tag. Empty and singleton sets are accepted.
    #[must_use]
    pub fn set(elements: impl IntoIterator<Item = ExprTag>) -> Self {
        Self::Expr(ExprTag::Set(SetTag::new(elements)))
    }

    /// A simple (list) tag
    #[must_use]
    pub fn simple(kind: impl Into<String>, elements: Vec<ExprTag>) -> Self {
        Self::Expr(ExprTag::Simple(SimpleTag::new(kind, elements)))
    }

    /// Whether this is the null tag
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Greatest lower bound of two tags
    #[must_use]
    pub fn intersect(&self, other: &Tag) -> Tag {
        match (self, other) {
            (Tag::Null, _) | (_, Tag::Null) => Tag::Null,
            (Tag::All, t) | (t, Tag::All) => t.clone(),
            (Tag::Expr(a), Tag::Expr(b)) => {
                if a == b {
                    return self.clone();
                }
                Tag::from(a.meet(b))
            }
        }
    }

    /// Whether every permission granted by `other` is granted by `self`
    #[must_use]
    pub fn implies(&self, other: &Tag) -> bool {
        self.intersect(other) == *other
    }
}

impl From<ExprTag> for Tag {
    fn from(expr: ExprTag) -> Self {
        Self::Expr(expr)
    }
}

impl From<Option<ExprTag>> for Tag {
    fn from(expr: Option<ExprTag>) -> Self {
        expr.map_or(Self::Null, Self::Expr)
    }
}

impl ExprTag {
    /// An exact string expression
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// A prefix expression
    #[must_use]
    pub fn prefix(s: impl Into<String>) -> Self {
        Self::Prefix(s.into())
    }

    /// Intersection of two expressions; `None` stands for the null tag.
    ///
    /// Every ordered pair of variants is listed here so that a new variant
    /// does not compile until its intersections are defined.
    #[must_use]
    pub fn meet(&self, other: &ExprTag) -> Option<ExprTag> {
        use ExprTag::{Prefix, Range, ReversePrefix, Set, Simple, String};

        match (self, other) {
            (Set(set), x) | (x, Set(set)) => set.meet(x),

            (String(a), String(b)) => (a == b).then(|| String(a.clone())),
            (String(s), Prefix(p)) | (Prefix(p), String(s)) => {
                s.starts_with(p.as_str()).then(|| String(s.clone()))
            }
            (String(s), ReversePrefix(r)) | (ReversePrefix(r), String(s)) => {
                r.starts_with(s.as_str()).then(|| String(s.clone()))
            }
            (String(s), Range(r)) | (Range(r), String(s)) => {
                r.contains(s).then(|| String(s.clone()))
            }

            (Prefix(a), Prefix(b)) => {
                if a.starts_with(b.as_str()) {
                    Some(Prefix(a.clone()))
                } else if b.starts_with(a.as_str()) {
                    Some(Prefix(b.clone()))
                } else {
                    None
                }
            }
            (Prefix(p), ReversePrefix(r)) | (ReversePrefix(r), Prefix(p)) => {
                if !r.starts_with(p.as_str()) {
                    return None;
                }
                SetTag::reduce(
                    prefixes(r)
                        .filter(|s| s.len() >= p.len())
                        .map(|s| String(s.to_owned()))
                        .collect(),
                )
            }
            // An interval of prefix blocks is not representable; fail safe.
            (Prefix(_), Range(_)) | (Range(_), Prefix(_)) => None,

            (ReversePrefix(a), ReversePrefix(b)) => {
                Some(ReversePrefix(common_prefix(a, b).to_owned()))
            }
            (ReversePrefix(r), Range(range)) | (Range(range), ReversePrefix(r)) => {
                SetTag::reduce(
                    prefixes(r)
                        .filter(|s| range.contains(s))
                        .map(|s| String(s.to_owned()))
                        .collect(),
                )
            }

            (Range(a), Range(b)) => a.meet(b).map(Range),

            (Simple(a), Simple(b)) => a.meet(b).map(Simple),
            (Simple(_), String(_) | Prefix(_) | ReversePrefix(_) | Range(_))
            | (String(_) | Prefix(_) | ReversePrefix(_) | Range(_), Simple(_)) => None,
        }
    }

    /// Whether `self ∩ other == other`
    #[must_use]
    pub fn implies(&self, other: &ExprTag) -> bool {
        self == other || self.meet(other).as_ref() == Some(other)
    }
}

/// Every prefix of `s` on a character boundary, shortest first, `s` included
fn prefixes(s: &str) -> impl Iterator<Item = &str> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .map(move |i| &s[..i])
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

/// A finite union of expressions.
///
/// Elements are kept sorted and deduplicated, and nested sets are flattened,
/// so equal sets compare equal regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<ExprTag>")]
pub struct SetTag(Vec<ExprTag>);

impl SetTag {
    /// Create a set. Empty and singleton sets are accepted for compatibility
    /// with existing certificates.
    #[must_use]
    pub fn new(elements: impl IntoIterator<Item = ExprTag>) -> Self {
        let mut flat = Vec::new();
        for e in elements {
            match e {
                ExprTag::Set(inner) => flat.extend(inner.0),
                e => flat.push(e),
            }
        }
        flat.sort();
        flat.dedup();
        Self(flat)
    }

    /// The set's elements
    #[must_use]
    pub fn elements(&self) -> &[ExprTag] {
        &self.0
    }

    fn meet(&self, other: &ExprTag) -> Option<ExprTag> {
        let others = match other {
            ExprTag::Set(s) => s.0.as_slice(),
            x => std::slice::from_ref(x),
        };
        let mut out = Vec::new();
        for a in &self.0 {
            for b in others {
                match a.meet(b) {
                    Some(ExprTag::Set(s)) => out.extend(s.0),
                    Some(e) => out.push(e),
                    None => {}
                }
            }
        }
        Self::reduce(out)
    }

    /// Canonicalize a union: drop elements implied by another element, then
    /// collapse to the null tag or a lone element where possible.
    fn reduce(elements: Vec<ExprTag>) -> Option<ExprTag> {
        let SetTag(elements) = SetTag::new(elements);
        let n = elements.len();
        let redundant = |i: usize| {
            (0..n).any(|j| {
                j != i
                    && elements[j].implies(&elements[i])
                    && (j < i || !elements[i].implies(&elements[j]))
            })
        };
        let kept: Vec<ExprTag> = (0..n)
            .filter(|&i| !redundant(i))
            .map(|i| elements[i].clone())
            .collect();

        match kept.len() {
            0 => None,
            1 => kept.into_iter().next(),
            _ => Some(ExprTag::Set(SetTag(kept))),
        }
    }
}

impl From<Vec<ExprTag>> for SetTag {
    fn from(elements: Vec<ExprTag>) -> Self {
        Self::new(elements)
    }
}

/// A structured permission such as `(grant read (* prefix /home/))`.
///
/// A shorter list is implicitly extended with `(*)`, so `(ftp host)` grants
/// everything `(ftp host read)` does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimpleTag {
    kind: String,
    elements: Vec<ExprTag>,
}

impl SimpleTag {
    /// Create a simple tag
    #[must_use]
    pub fn new(kind: impl Into<String>, elements: Vec<ExprTag>) -> Self {
        Self {
            kind: kind.into(),
            elements,
        }
    }

    /// The type string
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The nested expressions
    #[must_use]
    pub fn elements(&self) -> &[ExprTag] {
        &self.elements
    }

    fn meet(&self, other: &SimpleTag) -> Option<SimpleTag> {
        if self.kind != other.kind {
            return None;
        }
        let (long, short) = if self.elements.len() >= other.elements.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut elements = Vec::with_capacity(long.elements.len());
        for (a, b) in long.elements.iter().zip(&short.elements) {
            elements.push(a.meet(b)?);
        }
        elements.extend_from_slice(&long.elements[short.elements.len()..]);
        Some(SimpleTag {
            kind: self.kind.clone(),
            elements,
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "(*)"),
            Self::Null => write!(f, "(null)"),
            Self::Expr(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for ExprTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Prefix(s) => write!(f, "(* prefix {})", s),
            Self::ReversePrefix(s) => write!(f, "(* reverse-prefix {})", s),
            Self::Range(r) => write!(f, "{}", r),
            Self::Set(s) => {
                write!(f, "(* set")?;
                for e in &s.0 {
                    write!(f, " {}", e)?;
                }
                write!(f, ")")
            }
            Self::Simple(s) => {
                write!(f, "({}", s.kind)?;
                for e in &s.elements {
                    write!(f, " {}", e)?;
                }
                write!(f, ")")
            }
        }
    }
}
