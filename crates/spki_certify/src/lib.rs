//! Signed SPKI certificates and verifiable proofs.
//!
//! This crate adds Ed25519 signatures to the unsigned statements of
//! `spki_core` and defines [`Proof`], the unit the prover produces and
//! relying parties check.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod certificate;
pub mod proof;
pub mod signature;

pub use certificate::{Certificate, CertificateError};
pub use proof::{Proof, VerifyError};
pub use signature::{Signature, SignatureError, SignatureScheme, Signer, Verifier};
