//! Core error types for SPKI values.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while constructing or decoding SPKI values.
///
/// Algebraic failures (two statements that do not compose) are not errors
/// of this kind; see [`crate::cert::Incompatible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A name with no local-name components
    EmptyName,

    /// Threshold with k outside 1..=n
    InvalidThreshold { k: usize, n: usize },

    /// Invalid public key bytes
    InvalidKey { reason: String },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name must have at least one local name"),
            Self::InvalidThreshold { k, n } => {
                write!(f, "Invalid threshold: {} of {}", k, n)
            }
            Self::InvalidKey { reason } => write!(f, "Invalid key: {}", reason),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::EmptyName;
        assert_eq!(format!("{}", err), "Name must have at least one local name");

        let err = CoreError::InvalidThreshold { k: 3, n: 2 };
        assert_eq!(format!("{}", err), "Invalid threshold: 3 of 2");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(CoreError::EmptyName, CoreError::EmptyName);
        assert_ne!(CoreError::EmptyName, CoreError::InvalidThreshold { k: 0, n: 1 });
    }
}
