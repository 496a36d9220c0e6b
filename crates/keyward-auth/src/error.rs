//! Caller-facing error type.
//!
//! Internal errors ([`TokenError`], [`RotationError`]) keep every distinction
//! for logging and tests. At the boundary they fold into [`AuthError`], where
//! every credential fault looks the same to the caller.

use std::fmt;

use crate::rotation::RotationError;
use crate::storage::StorageError;
use crate::token::TokenError;

/// Message returned for every rejected bearer token.
pub const INVALID_TOKEN_MESSAGE: &str = "invalid token";

/// Errors surfaced to callers of the auth subsystem.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The presented credential was rejected.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Opaque description safe to return to the caller.
        message: String,
    },

    /// The request itself is malformed.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Description of the request problem.
        message: String,
    },

    /// The service could not complete the request.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates the opaque `Unauthorized` error used for any token fault.
    #[must_use]
    pub fn invalid_token() -> Self {
        Self::unauthorized(INVALID_TOKEN_MESSAGE)
    }

    /// Creates a new `BadRequest` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::BadRequest { .. } => ErrorCategory::Validation,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        if err.is_client_error() {
            tracing::debug!(error = %err, category = %err.category(), "Rejected bearer token");
            Self::invalid_token()
        } else {
            tracing::error!(error = %err, category = %err.category(), "Token operation failed");
            Self::internal("token service unavailable")
        }
    }
}

impl From<RotationError> for AuthError {
    fn from(err: RotationError) -> Self {
        tracing::error!(error = %err, "Key rotation failed");
        Self::internal("key rotation failed")
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = %err, "Key store failed");
        Self::internal("key store unavailable")
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential checks.
    Authentication,
    /// Token validation.
    Token,
    /// Signing key availability or decoding.
    Key,
    /// Request or claim validation.
    Validation,
    /// Storage backends.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Key => write!(f, "key"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
