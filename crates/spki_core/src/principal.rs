//! Principals, SDSI names and the subjects a statement can speak about.

use crate::error::{CoreError, CoreResult};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An Ed25519 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex::serde")] pub [u8; 32]);

impl PublicKey {
    /// Create from raw key bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    ///
    /// # Errors
    ///
    /// Returns error if hex is invalid or not 32 bytes
    pub fn from_hex(hex: &str) -> CoreResult<Self> {
        let bytes = hex::decode(hex).map_err(|e| CoreError::InvalidKey {
            reason: e.to_string(),
        })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| CoreError::InvalidKey {
            reason: format!("expected 32 bytes, got {}", b.len()),
        })?;
        Ok(Self(arr))
    }

    /// BLAKE3 digest of the key bytes
    #[must_use]
    pub fn hash(&self) -> Hash {
        Hash::compute(&self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// An entity identified by a public key or by the hash of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    /// The key itself
    Key(PublicKey),
    /// BLAKE3 hash of the key
    KeyHash(Hash),
}

impl Principal {
    /// The public key, when the principal carries one
    #[must_use]
    pub fn key(&self) -> Option<&PublicKey> {
        match self {
            Self::Key(key) => Some(key),
            Self::KeyHash(_) => None,
        }
    }

    /// The key hash identifying this principal
    #[must_use]
    pub fn to_hash(&self) -> Hash {
        match self {
            Self::Key(key) => key.hash(),
            Self::KeyHash(hash) => *hash,
        }
    }

    /// Whether `key` is the key of this principal, in either form
    #[must_use]
    pub fn matches_key(&self, key: &PublicKey) -> bool {
        match self {
            Self::Key(own) => own == key,
            Self::KeyHash(hash) => *hash == key.hash(),
        }
    }
}

impl From<PublicKey> for Principal {
    fn from(key: PublicKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key:{}", &key.to_hex()[..16]),
            Self::KeyHash(hash) => write!(f, "hash:{}", &hash.to_hex()[..16]),
        }
    }
}

#[derive(Deserialize)]
struct RawName {
    issuer: Principal,
    names: Vec<String>,
}

impl TryFrom<RawName> for Name {
    type Error = CoreError;

    fn try_from(raw: RawName) -> CoreResult<Self> {
        Self::new(raw.issuer, raw.names)
    }
}

/// An SDSI extended name: a principal followed by one or more local names.
///
/// `K friends colleagues` reads as "the colleagues of the friends of K".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawName")]
pub struct Name {
    issuer: Principal,
    names: Vec<String>,
}

impl Name {
    /// Create an extended name
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyName`] when `names` is empty
    pub fn new(issuer: Principal, names: Vec<String>) -> CoreResult<Self> {
        if names.is_empty() {
            return Err(CoreError::EmptyName);
        }
        Ok(Self { issuer, names })
    }

    /// Create a local name with a single component
    #[must_use]
    pub fn local(issuer: Principal, name: impl Into<String>) -> Self {
        Self {
            issuer,
            names: vec![name.into()],
        }
    }

    /// The principal whose namespace the first component lives in
    #[must_use]
    pub fn issuer(&self) -> &Principal {
        &self.issuer
    }

    /// The local-name components
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The local name made of the issuer and the first component
    #[must_use]
    pub fn first(&self) -> Name {
        Name {
            issuer: self.issuer.clone(),
            names: self.names[..1].to_vec(),
        }
    }

    /// The components left after stripping `prefix`, if `prefix` is a prefix
    /// of this name. An empty slice means the names are equal.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Name) -> Option<&[String]> {
        if self.issuer != prefix.issuer || !self.names.starts_with(&prefix.names) {
            return None;
        }
        Some(&self.names[prefix.names.len()..])
    }

    /// This name with `rest` appended
    #[must_use]
    pub fn extended(&self, rest: &[String]) -> Name {
        let mut names = self.names.clone();
        names.extend_from_slice(rest);
        Name {
            issuer: self.issuer.clone(),
            names,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(name {}", self.issuer)?;
        for name in &self.names {
            write!(f, " {}", name)?;
        }
        write!(f, ")")
    }
}

#[derive(Deserialize)]
struct RawThreshold {
    k: usize,
    subjects: Vec<Subject>,
}

impl TryFrom<RawThreshold> for Threshold {
    type Error = CoreError;

    fn try_from(raw: RawThreshold) -> CoreResult<Self> {
        Self::new(raw.k, raw.subjects)
    }
}

/// A k-of-n threshold subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawThreshold")]
pub struct Threshold {
    k: usize,
    subjects: Vec<Subject>,
}

impl Threshold {
    /// Create a threshold subject
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidThreshold`] unless `1 <= k <= subjects.len()`
    pub fn new(k: usize, subjects: Vec<Subject>) -> CoreResult<Self> {
        if k == 0 || k > subjects.len() {
            return Err(CoreError::InvalidThreshold {
                k,
                n: subjects.len(),
            });
        }
        Ok(Self { k, subjects })
    }

    /// Number of subjects that must agree
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// The candidate subjects
    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }
}

/// The right-hand side of a statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A principal
    Principal(Principal),
    /// An extended name still to be resolved
    Name(Name),
    /// k-of-n principals
    Threshold(Threshold),
    /// Hash of an object (not a key)
    ObjectHash(Hash),
}

impl Subject {
    /// The principal, if this subject is one
    #[must_use]
    pub fn as_principal(&self) -> Option<&Principal> {
        match self {
            Self::Principal(p) => Some(p),
            _ => None,
        }
    }

    /// The name, if this subject is one
    #[must_use]
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }
}

impl From<Principal> for Subject {
    fn from(p: Principal) -> Self {
        Self::Principal(p)
    }
}

impl From<PublicKey> for Subject {
    fn from(key: PublicKey) -> Self {
        Self::Principal(Principal::Key(key))
    }
}

impl From<Name> for Subject {
    fn from(n: Name) -> Self {
        Self::Name(n)
    }
}

impl From<Threshold> for Subject {
    fn from(t: Threshold) -> Self {
        Self::Threshold(t)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Principal(p) => write!(f, "{}", p),
            Self::Name(n) => write!(f, "{}", n),
            Self::Threshold(t) => {
                write!(f, "(k-of-n {} {}", t.k, t.subjects.len())?;
                for s in &t.subjects {
                    write!(f, " {}", s)?;
                }
                write!(f, ")")
            }
            Self::ObjectHash(h) => write!(f, "(object {})", h),
        }
    }
}
