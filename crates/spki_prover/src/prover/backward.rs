//! Subject-to-issuer search.

use super::SearchStrategy;
use crate::store::CertSelector;
use spki_core::{Cert, Subject};

/// Starts at the target's subject and looks for whoever speaks about each
/// issuer found so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backward;

impl SearchStrategy for Backward {
    fn seeds(&self, provee: &Cert) -> Vec<CertSelector> {
        vec![CertSelector::Subject(provee.subject().clone())]
    }

    fn follow(&self, cert: &Cert) -> Vec<CertSelector> {
        let mut next = vec![CertSelector::Subject(Subject::Principal(cert.issuer().clone()))];
        if let Some(def) = cert.as_name() {
            next.push(CertSelector::Compatible(def.full_name()));
        }
        next
    }
}
