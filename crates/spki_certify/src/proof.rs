//! Proofs: a derived statement and the certificate chain behind it.

use crate::certificate::{Certificate, CertificateError};
use serde::{Deserialize, Serialize};
use spki_core::{Cert, Incompatible};
use std::fmt;

/// A target [`Cert`] together with the ordered certificates that reduce to it.
///
/// Proofs built with [`Proof::from_certificate`] and [`Proof::compose`] keep
/// the target equal to the left-to-right reduction of the chain. Proofs read
/// from elsewhere must be checked with [`Proof::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proof {
    cert: Cert,
    certificates: Vec<Certificate>,
}

impl Proof {
    /// The one-link proof of a certificate's own statement
    #[must_use]
    pub fn from_certificate(certificate: Certificate) -> Self {
        Self {
            cert: certificate.cert.clone(),
            certificates: vec![certificate],
        }
    }

    /// Assemble a proof without checking it
    #[must_use]
    pub fn new(cert: Cert, certificates: Vec<Certificate>) -> Self {
        Self { cert, certificates }
    }

    /// The statement this proof establishes
    #[must_use]
    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    /// The chain, issuer end first
    #[must_use]
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// Number of certificates in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Whether the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Chain `next` after this proof.
    ///
    /// # Errors
    ///
    /// Returns [`Incompatible`] when the two statements do not reduce.
    pub fn compose(&self, next: &Proof) -> Result<Proof, Incompatible> {
        let cert = self.cert.compose(&next.cert)?;
        let mut certificates = Vec::with_capacity(self.len() + next.len());
        certificates.extend_from_slice(&self.certificates);
        certificates.extend_from_slice(&next.certificates);
        Ok(Proof { cert, certificates })
    }

    /// Check every signature, then that the chain reduces exactly to the
    /// stated target.
    ///
    /// # Errors
    ///
    /// Returns the first failure found; see [`VerifyError`].
    pub fn verify(&self) -> Result<(), VerifyError> {
        let (first, rest) = self.certificates.split_first().ok_or(VerifyError::EmptyChain)?;

        for (index, certificate) in self.certificates.iter().enumerate() {
            certificate.verify().map_err(|source| match source {
                CertificateError::IssuerMismatch => VerifyError::UnknownIssuerKey { index },
                source => VerifyError::BadSignature { index, source },
            })?;
        }

        let mut reduced = first.cert.clone();
        for (offset, certificate) in rest.iter().enumerate() {
            reduced = reduced
                .compose(&certificate.cert)
                .map_err(|source| VerifyError::Incompatible {
                    index: offset + 1,
                    source,
                })?;
        }

        if reduced != self.cert {
            return Err(VerifyError::TargetMismatch);
        }
        tracing::trace!(certificates = self.len(), "proof verified");
        Ok(())
    }
}

impl fmt::Display for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {} certificate(s)", self.cert, self.len())
    }
}

/// Why a proof was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// The proof lists no certificates
    #[error("proof has no certificates")]
    EmptyChain,
    /// A certificate's signature does not check out
    #[error("certificate {index} has a bad signature")]
    BadSignature {
        /// Position in the chain
        index: usize,
        /// Underlying failure
        #[source]
        source: CertificateError,
    },
    /// A certificate was signed by a key other than its issuer's
    #[error("certificate {index} is not signed by its issuer")]
    UnknownIssuerKey {
        /// Position in the chain
        index: usize,
    },
    /// The chain breaks at a certificate
    #[error("certificate {index} does not follow from the chain before it")]
    Incompatible {
        /// Position in the chain
        index: usize,
        /// Reduction failure
        #[source]
        source: Incompatible,
    },
    /// The chain reduces to something other than the stated target
    #[error("chain does not reduce to the stated target")]
    TargetMismatch,
    /// The proof is valid but does not establish the requested statement
    #[error("proof does not imply the requested statement")]
    DoesNotImply,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signer;
    use spki_core::{Name, Principal, Tag};

    fn signer(b: u8) -> Signer {
        Signer::from_secret(&[b; 32]).unwrap()
    }

    fn p(s: &Signer) -> Principal {
        s.public_key().into()
    }

    fn link(issuer: &Signer, cert: Cert) -> Proof {
        assert_eq!(cert.issuer(), &p(issuer));
        Proof::from_certificate(Certificate::sign(cert, issuer).unwrap())
    }

    #[test]
    fn test_single_certificate_proof() {
        let (k1, k2) = (signer(1), signer(2));
        let proof = link(&k1, Cert::auth(p(&k1), p(&k2), Tag::string("read"), false));
        assert_eq!(proof.len(), 1);
        assert!(proof.verify().is_ok());
    }

    #[test]
    fn test_compose_and_verify_chain() {
        let (k1, k2, k3) = (signer(1), signer(2), signer(3));
        let a = link(&k1, Cert::auth(p(&k1), Name::local(p(&k1), "friends"), Tag::string("write"), false));
        let b = link(&k1, Cert::name(p(&k1), "friends", p(&k2)));
        let c = link(&k2, Cert::name(p(&k2), "unused", p(&k3)));

        let ab = a.compose(&b).unwrap();
        assert_eq!(ab.cert(), &Cert::auth(p(&k1), p(&k2), Tag::string("write"), false));
        assert_eq!(ab.len(), 2);
        assert!(ab.verify().is_ok());
        assert!(ab.compose(&c).is_err());
    }

    #[test]
    fn test_verify_empty_chain() {
        let k1 = signer(1);
        let proof = Proof::new(Cert::name(p(&k1), "n", p(&k1)), Vec::new());
        assert_eq!(proof.verify(), Err(VerifyError::EmptyChain));
    }

    #[test]
    fn test_verify_target_mismatch() {
        let (k1, k2) = (signer(1), signer(2));
        let good = link(&k1, Cert::auth(p(&k1), p(&k2), Tag::string("read"), false));
        let forged = Proof::new(
            Cert::auth(p(&k1), p(&k2), Tag::All, false),
            good.certificates().to_vec(),
        );
        assert_eq!(forged.verify(), Err(VerifyError::TargetMismatch));
    }

    #[test]
    fn test_verify_broken_chain() {
        let (k1, k2, k3) = (signer(1), signer(2), signer(3));
        let a = link(&k1, Cert::auth(p(&k1), p(&k2), Tag::All, false));
        let b = link(&k2, Cert::auth(p(&k2), p(&k3), Tag::All, false));
        let mut certificates = a.certificates().to_vec();
        certificates.extend_from_slice(b.certificates());
        let proof = Proof::new(Cert::auth(p(&k1), p(&k3), Tag::All, false), certificates);
        assert!(matches!(proof.verify(), Err(VerifyError::Incompatible { index: 1, .. })));
    }

    #[test]
    fn test_verify_bad_signature_kinds() {
        let (k1, k2) = (signer(1), signer(2));
        let proof = link(&k1, Cert::auth(p(&k1), p(&k2), Tag::string("read"), false));

        let mut tampered = proof.certificates()[0].clone();
        tampered.signature.bytes[0] ^= 0xff;
        let bad = Proof::new(proof.cert().clone(), vec![tampered]);
        assert!(matches!(bad.verify(), Err(VerifyError::BadSignature { index: 0, .. })));

        let mut resigned = proof.certificates()[0].clone();
        resigned.signer = k2.public_key();
        let foreign = Proof::new(proof.cert().clone(), vec![resigned]);
        assert_eq!(foreign.verify(), Err(VerifyError::UnknownIssuerKey { index: 0 }));
    }

    #[test]
    fn test_proof_json() {
        let (k1, k2) = (signer(1), signer(2));
        let proof = link(&k1, Cert::auth(p(&k1), p(&k2), Tag::prefix("/a"), true));
        let json = serde_json::to_string(&proof).unwrap();
        let restored: Proof = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, proof);
        assert!(restored.verify().is_ok());
    }
}
