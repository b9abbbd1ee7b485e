//! Signed certificates.

use crate::signature::{Signature, SignatureError, Signer, Verifier};
use serde::{Deserialize, Serialize};
use spki_core::{Cert, Hash, PublicKey};

/// A [`Cert`] signed by its issuer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Certificate {
    /// The signed statement
    pub cert: Cert,
    /// Key that produced the signature
    pub signer: PublicKey,
    /// Signature over the CBOR encoding of `cert`
    pub signature: Signature,
}

impl Certificate {
    /// Sign `cert` as its issuer
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::IssuerMismatch`] if `signer` is not the
    /// issuer's key, or a serialization error
    pub fn sign(cert: Cert, signer: &Signer) -> Result<Self, CertificateError> {
        let key = signer.public_key();
        if !cert.issuer().matches_key(&key) {
            return Err(CertificateError::IssuerMismatch);
        }
        let signature = signer.sign(&Self::signed_bytes(&cert)?);
        Ok(Self {
            cert,
            signer: key,
            signature,
        })
    }

    /// The bytes an issuer signs for `cert`
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn signed_bytes(cert: &Cert) -> Result<Vec<u8>, CertificateError> {
        serde_cbor::to_vec(cert).map_err(|_| CertificateError::SerializationError)
    }

    /// The signed statement
    #[must_use]
    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    /// Check the signature and that the signer is the issuer
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::IssuerMismatch`] when the signer key is
    /// not the issuer's, [`CertificateError::Signature`] when the signature
    /// does not verify
    pub fn verify(&self) -> Result<(), CertificateError> {
        if !self.cert.issuer().matches_key(&self.signer) {
            return Err(CertificateError::IssuerMismatch);
        }
        let bytes = Self::signed_bytes(&self.cert)?;
        Verifier::new(&self.signer)?.verify(&bytes, &self.signature)?;
        Ok(())
    }

    /// BLAKE3 digest of the signed bytes plus signature
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn digest(&self) -> Result<Hash, CertificateError> {
        let mut bytes = Self::signed_bytes(&self.cert)?;
        bytes.extend_from_slice(self.signature.as_bytes());
        Ok(Hash::compute(&bytes))
    }

    /// Get the certificate as JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, CertificateError> {
        serde_json::to_string_pretty(self).map_err(|_| CertificateError::SerializationError)
    }

    /// Parse certificate from JSON
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails
    pub fn from_json(json: &str) -> Result<Self, CertificateError> {
        serde_json::from_str(json).map_err(|_| CertificateError::ParseError)
    }
}

/// Certificate-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    /// Serialization error
    #[error("serialization error")]
    SerializationError,
    /// Parse error
    #[error("parse error")]
    ParseError,
    /// Signer key does not belong to the issuer
    #[error("signer key does not match the issuer")]
    IssuerMismatch,
    /// Signature failure
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use spki_core::{Principal, Tag};

    fn signer(b: u8) -> Signer {
        Signer::from_secret(&[b; 32]).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let s = signer(1);
        let cert = Cert::auth(s.public_key().into(), signer(2).public_key(), Tag::All, false);
        let certificate = Certificate::sign(cert, &s).unwrap();
        assert!(certificate.verify().is_ok());
    }

    #[test]
    fn test_sign_by_key_hash_issuer() {
        let s = signer(1);
        let issuer = Principal::KeyHash(s.public_key().hash());
        let cert = Cert::name(issuer, "friends", signer(2).public_key());
        assert!(Certificate::sign(cert, &s).unwrap().verify().is_ok());
    }

    #[test]
    fn test_sign_rejects_foreign_issuer() {
        let cert = Cert::name(signer(2).public_key().into(), "friends", signer(3).public_key());
        assert_eq!(
            Certificate::sign(cert, &signer(1)),
            Err(CertificateError::IssuerMismatch)
        );
    }

    #[test]
    fn test_tampered_cert_fails() {
        let s = signer(1);
        let cert = Cert::auth(s.public_key().into(), signer(2).public_key(), Tag::string("read"), false);
        let mut certificate = Certificate::sign(cert, &s).unwrap();
        certificate.cert = Cert::auth(s.public_key().into(), signer(2).public_key(), Tag::All, false);
        assert_eq!(
            certificate.verify(),
            Err(CertificateError::Signature(SignatureError::VerificationFailed))
        );
    }

    #[test]
    fn test_swapped_signer_fails() {
        let s = signer(1);
        let cert = Cert::name(s.public_key().into(), "n", signer(2).public_key());
        let mut certificate = Certificate::sign(cert, &s).unwrap();
        certificate.signer = signer(2).public_key();
        assert_eq!(certificate.verify(), Err(CertificateError::IssuerMismatch));
    }

    #[test]
    fn test_json_keeps_signature_valid() {
        let s = signer(4);
        let cert = Cert::auth(s.public_key().into(), signer(5).public_key(), Tag::prefix("/docs"), true)
            .with_comment("shared folder");
        let certificate = Certificate::sign(cert, &s).unwrap();
        let restored = Certificate::from_json(&certificate.to_json().unwrap()).unwrap();
        assert_eq!(restored, certificate);
        assert!(restored.verify().is_ok());
        assert_eq!(restored.digest().unwrap(), certificate.digest().unwrap());
    }
}
