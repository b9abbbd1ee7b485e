//! SPKI/SDSI proof search
//!
//! Builds certificate chains from a [`CertStore`] and validates chains
//! handed in by others.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod multimap;
pub mod prover;
pub mod store;

pub use config::{ProverConfig, SearchDirection};
pub use multimap::MultiMap;
pub use prover::{Backward, Forward, Prover, ProverError, SearchStats, SearchStrategy};
pub use store::{CertSelector, CertStore, MemoryCertStore, StoreError};

use spki_certify::{Proof, VerifyError};
use spki_core::Cert;

/// Search `store` for a proof of `provee`.
///
/// # Errors
///
/// Returns [`ProverError`] if the store fails. A missing proof is `Ok(None)`.
pub fn build_proof<S: CertStore>(
    provee: Cert,
    store: S,
    config: &ProverConfig,
) -> Result<Option<Proof>, ProverError> {
    Prover::with_config(provee, store, config.clone()).get_proof()
}

/// Check that `proof` is sound and establishes `target`.
///
/// # Errors
///
/// Returns the verification failure, or [`VerifyError::DoesNotImply`] when a
/// sound proof proves something weaker than `target`.
pub fn validate_proof(proof: &Proof, target: &Cert) -> Result<(), VerifyError> {
    proof.verify()?;
    if !proof.cert().implies(target) {
        return Err(VerifyError::DoesNotImply);
    }
    Ok(())
}
