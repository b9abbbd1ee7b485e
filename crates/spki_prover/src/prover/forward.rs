//! Issuer-to-subject search.

use super::SearchStrategy;
use crate::store::CertSelector;
use spki_core::Cert;

/// Starts at the target's issuer and follows delegations and name
/// definitions towards the subject.
#[derive(Debug, Clone, Copy, Default)]
pub struct Forward;

impl SearchStrategy for Forward {
    fn seeds(&self, provee: &Cert) -> Vec<CertSelector> {
        vec![CertSelector::Issuer(provee.issuer().clone())]
    }

    fn follow(&self, cert: &Cert) -> Vec<CertSelector> {
        let mut next = Vec::new();
        // Names are resolved one component at a time.
        if let Some(name) = cert.subject().as_name() {
            next.push(CertSelector::Name(name.first()));
        }
        if let Some(delegate) = cert
            .as_auth()
            .filter(|a| a.auth.propagate)
            .and_then(|a| a.body.subject.as_principal())
        {
            next.push(CertSelector::Issuer(delegate.clone()));
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki_core::{Name, Principal, PublicKey, Tag};

    fn k(b: u8) -> Principal {
        Principal::Key(PublicKey::from_bytes([b; 32]))
    }

    #[test]
    fn test_seed_is_issuer() {
        let provee = Cert::auth(k(1), k(2), Tag::All, false);
        assert_eq!(Forward.seeds(&provee), vec![CertSelector::Issuer(k(1))]);
    }

    #[test]
    fn test_follows_delegation_only_when_propagating() {
        let open = Cert::auth(k(1), k(2), Tag::All, true);
        assert_eq!(Forward.follow(&open), vec![CertSelector::Issuer(k(2))]);
        let closed = Cert::auth(k(1), k(2), Tag::All, false);
        assert!(Forward.follow(&closed).is_empty());
    }

    #[test]
    fn test_follows_first_name_component() {
        let deep = Name::new(k(2), vec!["staff".into(), "leads".into()]).unwrap();
        let cert = Cert::name(k(1), "team", deep);
        assert_eq!(
            Forward.follow(&cert),
            vec![CertSelector::Name(Name::local(k(2), "staff"))]
        );
    }
}
