//! Certificate stores and the selectors used to query them.

use crate::multimap::MultiMap;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use spki_certify::Certificate;
use spki_core::{Cert, Name, Principal, Subject};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A query against a certificate store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertSelector {
    /// Every certificate issued by the principal
    Issuer(Principal),
    /// Certificates whose subject is exactly this
    Subject(Subject),
    /// Name certificates defining this local name
    Name(Name),
    /// Certificates whose subject is a name starting with this local name
    Compatible(Name),
}

impl CertSelector {
    /// Whether `cert` satisfies the selector
    #[must_use]
    pub fn matches(&self, cert: &Cert) -> bool {
        match self {
            Self::Issuer(p) => cert.issuer() == p,
            Self::Subject(s) => cert.subject() == s,
            Self::Name(n) => cert.as_name().is_some_and(|c| &c.full_name() == n),
            Self::Compatible(n) => cert
                .subject()
                .as_name()
                .is_some_and(|sub| &sub.first() == n),
        }
    }
}

impl fmt::Display for CertSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer(p) => write!(f, "issuer {}", p),
            Self::Subject(s) => write!(f, "subject {}", s),
            Self::Name(n) => write!(f, "name {}", n),
            Self::Compatible(n) => write!(f, "compatible {}", n),
        }
    }
}

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backing storage could not be read or written
    #[error("IO error: {reason}")]
    Io {
        /// Underlying failure
        reason: String,
    },
    /// Stored data could not be decoded
    #[error("decode error: {reason}")]
    Decode {
        /// Underlying failure
        reason: String,
    },
}

/// Source of certificates for the prover.
///
/// Implementations may return more than the selector asks for; callers
/// filter by composition. Repeated queries with the same selector must be
/// safe.
pub trait CertStore {
    /// Fetch certificates matching `selector`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage fails
    fn get(&self, selector: &CertSelector) -> Result<Vec<Certificate>, StoreError>;
}

impl<T: CertStore + ?Sized> CertStore for &T {
    fn get(&self, selector: &CertSelector) -> Result<Vec<Certificate>, StoreError> {
        (**self).get(selector)
    }
}

/// In-memory store indexed by every selector kind
#[derive(Debug, Default)]
pub struct MemoryCertStore {
    certificates: IndexSet<Certificate>,
    by_issuer: MultiMap<Principal, usize>,
    by_subject: MultiMap<Subject, usize>,
    by_name: MultiMap<Name, usize>,
    by_prefix: MultiMap<Name, usize>,
    queries: AtomicUsize,
}

impl MemoryCertStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `certificates`
    #[must_use]
    pub fn from_certificates(certificates: impl IntoIterator<Item = Certificate>) -> Self {
        let mut store = Self::new();
        for certificate in certificates {
            store.insert(certificate);
        }
        store
    }

    /// Add a certificate. Returns `false` if it was already present.
    pub fn insert(&mut self, certificate: Certificate) -> bool {
        let (idx, is_new) = self.certificates.insert_full(certificate);
        if !is_new {
            return false;
        }
        let cert = &self.certificates[idx].cert;
        self.by_issuer.insert(cert.issuer().clone(), idx);
        self.by_subject.insert(cert.subject().clone(), idx);
        if let Some(name_cert) = cert.as_name() {
            self.by_name.insert(name_cert.full_name(), idx);
        }
        if let Some(name) = cert.subject().as_name() {
            self.by_prefix.insert(name.first(), idx);
        }
        true
    }

    /// Number of certificates held
    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// All certificates, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates.iter()
    }

    /// Number of `get` calls served so far
    #[must_use]
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Load a store from a JSON array of certificates
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or decoded
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let certificates: Vec<Certificate> =
            serde_json::from_str(&json).map_err(|e| StoreError::Decode {
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), count = certificates.len(), "loaded certificate store");
        Ok(Self::from_certificates(certificates))
    }

    /// Save the store as a JSON array of certificates
    ///
    /// # Errors
    ///
    /// Returns error if encoding or writing fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let certificates: Vec<&Certificate> = self.certificates.iter().collect();
        let json = serde_json::to_string_pretty(&certificates).map_err(|e| StoreError::Decode {
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| StoreError::Io {
            reason: format!("failed to write {}: {}", path.display(), e),
        })
    }

    fn collect(&self, indices: impl Iterator<Item = usize>) -> Vec<Certificate> {
        indices
            .filter_map(|idx| self.certificates.get_index(idx).cloned())
            .collect()
    }
}

impl CertStore for MemoryCertStore {
    fn get(&self, selector: &CertSelector) -> Result<Vec<Certificate>, StoreError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let found = match selector {
            CertSelector::Issuer(p) => self.collect(self.by_issuer.get(p).copied()),
            CertSelector::Subject(s) => self.collect(self.by_subject.get(s).copied()),
            CertSelector::Name(n) => self.collect(self.by_name.get(n).copied()),
            CertSelector::Compatible(n) => self.collect(self.by_prefix.get(n).copied()),
        };
        tracing::trace!(selector = %selector, found = found.len(), "store query");
        Ok(found)
    }
}

impl FromIterator<Certificate> for MemoryCertStore {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        Self::from_certificates(iter)
    }
}
