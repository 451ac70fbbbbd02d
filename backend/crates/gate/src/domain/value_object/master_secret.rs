//! Master Secret Value Object
//!
//! The single shared secret guarding the console. Held zeroized in
//! memory and only ever compared in constant time over fixed-length
//! digests, so neither content nor length leaks through timing.

use platform::crypto::digest_eq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum accepted secret length
pub const MIN_SECRET_LENGTH: usize = 8;

/// Master secret policy violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasterSecretError {
    #[error("Master password must be at least {MIN_SECRET_LENGTH} characters")]
    TooShort,

    #[error("Master password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,
}

/// The configured master password
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret(String);

impl MasterSecret {
    pub fn new(secret: impl Into<String>) -> Result<Self, MasterSecretError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(MasterSecretError::EmptyOrWhitespace);
        }
        if secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(MasterSecretError::TooShort);
        }
        Ok(Self(secret))
    }

    /// Constant-time comparison against a submitted candidate
    pub fn verify(&self, candidate: &str) -> bool {
        digest_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

// The secret must never appear in logs or debug dumps.
impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterSecret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!(
            MasterSecret::new("").unwrap_err(),
            MasterSecretError::EmptyOrWhitespace
        );
        assert_eq!(
            MasterSecret::new("   ").unwrap_err(),
            MasterSecretError::EmptyOrWhitespace
        );
    }

    #[test]
    fn test_rejects_short() {
        assert_eq!(
            MasterSecret::new("short").unwrap_err(),
            MasterSecretError::TooShort
        );
    }

    #[test]
    fn test_verify() {
        let secret = MasterSecret::new("CorrectSecret1!").unwrap();
        assert!(secret.verify("CorrectSecret1!"));
        assert!(!secret.verify("wrong"));
        assert!(!secret.verify(""));
        assert!(!secret.verify("CorrectSecret1! "));
    }

    #[test]
    fn test_debug_redacts() {
        let secret = MasterSecret::new("CorrectSecret1!").unwrap();
        let debug = format!("{secret:?}");
        assert!(!debug.contains("CorrectSecret1!"));
    }
}
