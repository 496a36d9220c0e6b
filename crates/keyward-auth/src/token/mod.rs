//! Bearer token issuance and verification.
//!
//! - [`jwt`] - signing algorithms, claims and per-service token settings
//! - [`issuer`] - signing tokens with the current key
//! - [`verifier`] - parsing and validating presented tokens

pub mod issuer;
pub mod jwt;
pub mod verifier;

pub use issuer::TokenIssuer;
pub use jwt::{SigningAlgorithm, TokenClaims, TokenSettings};
pub use verifier::{TokenVerifier, verify_with_discovery};

use crate::error::ErrorCategory;
use crate::keys::KeyError;
use crate::storage::StorageError;

/// Errors that can occur while issuing or verifying tokens.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The key store holds no signing key.
    #[error("No signing key available")]
    NoSigningKey,

    /// The current signing key is past its own expiration.
    #[error("Current signing key expired at {expired_at}")]
    SigningKeyExpired {
        /// Expiration of the key, Unix seconds.
        expired_at: i64,
    },

    /// The current key's stored material could not be decoded.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The key store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The signing operation itself failed.
    #[error("Failed to sign token: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// The claims requested for a new token are not acceptable.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why the claims were refused.
        message: String,
    },

    /// The presented token is not a well-formed signed structure.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the structural problem.
        message: String,
    },

    /// The signature does not match the current key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token's expiry has passed.
    #[error("Token expired")]
    Expired,

    /// The token was issued by someone else.
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Any other claim validation failure.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of the validation failure.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Returns `true` if the presented credential is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::InvalidSignature
                | Self::Expired
                | Self::InvalidIssuer
                | Self::InvalidToken { .. }
        )
    }

    /// Returns `true` if the service itself is at fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoSigningKey | Self::SigningKeyExpired { .. } | Self::Key(_) => {
                ErrorCategory::Key
            }
            Self::Storage(_) => ErrorCategory::Infrastructure,
            Self::Signing { .. } => ErrorCategory::Internal,
            Self::InvalidClaims { .. } => ErrorCategory::Validation,
            Self::MalformedToken { .. }
            | Self::InvalidSignature
            | Self::Expired
            | Self::InvalidIssuer
            | Self::InvalidToken { .. } => ErrorCategory::Token,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::malformed_token(err.to_string()),
            _ => Self::invalid_token(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_error_display() {
        assert_eq!(TokenError::NoSigningKey.to_string(), "No signing key available");
        assert_eq!(TokenError::Expired.to_string(), "Token expired");
        assert_eq!(
            TokenError::from(KeyError::malformed_key("bad header")).to_string(),
            "Malformed key: bad header"
        );
    }

    #[test]
    fn test_token_error_predicates() {
        assert!(TokenError::Expired.is_client_error());
        assert!(TokenError::InvalidSignature.is_client_error());
        assert!(TokenError::InvalidIssuer.is_client_error());
        assert!(TokenError::malformed_token("x").is_client_error());
        assert!(TokenError::invalid_token("x").is_client_error());

        assert!(TokenError::NoSigningKey.is_server_error());
        assert!(TokenError::from(KeyError::key_parse("x")).is_server_error());
        assert!(TokenError::from(StorageError::backend("x")).is_server_error());
        assert!(TokenError::signing("x").is_server_error());
    }

    #[test]
    fn test_token_error_category() {
        assert_eq!(TokenError::NoSigningKey.category(), ErrorCategory::Key);
        assert_eq!(TokenError::Expired.category(), ErrorCategory::Token);
        assert_eq!(
            TokenError::from(StorageError::backend("x")).category(),
            ErrorCategory::Infrastructure
        );
    }
}
