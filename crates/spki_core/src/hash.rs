//! BLAKE3 digests naming keys and objects.
//!
//! A [`Hash`] identifies a principal by the digest of its key, or an
//! arbitrary object in a [`crate::Subject::ObjectHash`] subject.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 32-byte BLAKE3 digest, hex in JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex::serde")] [u8; 32]);

impl Hash {
    /// Digest length in bytes
    pub const LEN: usize = 32;

    /// Digest `data`
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap an existing digest
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The digest bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex form
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] unless `s` is 64 hex digits
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        s.parse()
    }
}

impl FromStr for Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| HashError::InvalidHex)?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| HashError::InvalidLength(b.len()))?;
        Ok(Self(digest))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(hash blake3 #{}#)", self.to_hex())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Malformed digest text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Not hex
    InvalidHex,
    /// Wrong number of bytes
    InvalidLength(usize),
}

impl std::error::Error for HashError {}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "digest is not hex"),
            Self::InvalidLength(len) => write!(f, "digest has {} bytes, expected {}", len, Hash::LEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_digest() {
        let key = [7u8; 32];
        let digest = Hash::compute(&key);
        assert_eq!(digest, Hash::compute(&key));
        assert_ne!(digest, Hash::compute(&[8u8; 32]));
        assert_eq!(digest.as_bytes(), blake3::hash(&key).as_bytes());
    }

    #[test]
    fn test_parse_hex() {
        let digest = Hash::compute(b"object");
        assert_eq!(digest.to_hex().parse::<Hash>().unwrap(), digest);
        assert_eq!(Hash::from_hex("abcd"), Err(HashError::InvalidLength(2)));
        assert_eq!(Hash::from_hex("zz"), Err(HashError::InvalidHex));
    }

    #[test]
    fn test_json_is_hex() {
        let digest = Hash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<Hash>(&json).unwrap(), digest);
    }

    #[test]
    fn test_display() {
        let digest = Hash::from_bytes([0; 32]);
        assert!(digest.to_string().starts_with("(hash blake3 #0000"));
    }
}
