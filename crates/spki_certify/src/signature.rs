//! Ed25519 signing and verification for certificates.

use ed25519_dalek::Signature as DalekSignature;
use ed25519_dalek::Signer as DalekSigner;
use ed25519_dalek::Verifier as DalekVerifier;
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use spki_core::PublicKey;

/// Signature scheme for certificates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// Ed25519 signature scheme
    #[default]
    Ed25519,
}

/// A detached signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Signature scheme used
    pub scheme: SignatureScheme,
    /// Signature bytes, hex in JSON
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

impl Signature {
    /// Create an Ed25519 signature
    #[must_use]
    pub fn ed25519(bytes: Vec<u8>) -> Self {
        Self {
            scheme: SignatureScheme::Ed25519,
            bytes,
        }
    }

    /// Get the signature bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Holds a principal's secret key
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Create a signer with a fresh random key
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self {
            signing_key: SigningKey::from_bytes(&bytes),
        }
    }

    /// Create a signer from a 32-byte secret key
    ///
    /// # Errors
    ///
    /// Returns error if the secret is not 32 bytes
    pub fn from_secret(secret: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; 32] = secret
            .try_into()
            .map_err(|_| SignatureError::InvalidSecretKey)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    /// Parse a hex-encoded secret key
    ///
    /// # Errors
    ///
    /// Returns error if hex is invalid or not 32 bytes
    pub fn from_secret_hex(hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(hex.trim()).map_err(|_| SignatureError::InvalidHex)?;
        Self::from_secret(&bytes)
    }

    /// The secret key, hex-encoded
    #[must_use]
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The public key of this signer
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::ed25519(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Checks signatures under one public key
pub struct Verifier {
    verifying_key: VerifyingKey,
}

impl Verifier {
    /// Create a verifier for `key`
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid Ed25519 point
    pub fn new(key: &PublicKey) -> Result<Self, SignatureError> {
        let verifying_key =
            VerifyingKey::from_bytes(key.as_bytes()).map_err(|_| SignatureError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }

    /// Verify a signature on a message
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::VerificationFailed`] if the signature does
    /// not check out, or a format error if it is malformed
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        if signature.scheme != SignatureScheme::Ed25519 {
            return Err(SignatureError::UnsupportedScheme);
        }
        let sig = DalekSignature::from_slice(&signature.bytes)
            .map_err(|_| SignatureError::InvalidSignature)?;
        self.verifying_key
            .verify(message, &sig)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

/// Signature-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Invalid secret key
    #[error("invalid secret key")]
    InvalidSecretKey,
    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Malformed signature bytes
    #[error("invalid signature")]
    InvalidSignature,
    /// Invalid hex encoding
    #[error("invalid hex encoding")]
    InvalidHex,
    /// Unsupported signature scheme
    #[error("unsupported signature scheme")]
    UnsupportedScheme,
    /// Verification failed
    #[error("signature verification failed")]
    VerificationFailed,
}
