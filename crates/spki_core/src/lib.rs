//! SPKI/SDSI core types
//!
//! Principals, names, tags, validity and the unsigned certificate algebra.
//! Everything here is pure: no signatures, no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod cert;
pub mod error;
pub mod hash;
pub mod principal;
pub mod tag;
pub mod validity;

// Re-exports
pub use auth::Auth;
pub use cert::{AuthCert, Cert, CertBody, Incompatible, NameCert};
pub use error::{CoreError, CoreResult};
pub use hash::{Hash, HashError};
pub use principal::{Name, Principal, PublicKey, Subject, Threshold};
pub use tag::{ExprTag, RangeBound, RangeOrdering, RangeTag, SetTag, SimpleTag, Tag};
pub use validity::{OnlineTest, OnlineTestKind, Validity};
