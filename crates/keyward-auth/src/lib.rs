//! # keyward-auth
//!
//! Signing key lifecycle and bearer token handling for Keyward.
//!
//! This crate provides:
//! - RSA signing key generation rendered as PEM text
//! - A storage contract for key records, ordered newest expiration first
//! - Selection of the single current signing key, decoded lazily and cached
//! - A key discovery document (JWKS) for external verifiers
//! - Token issuance and verification with typed failure reasons
//! - Axum handlers and extractors for the HTTP surface
//!
//! ## Overview
//!
//! Keys flow from generation into a [`storage::SigningKeyStore`] on rotation.
//! Every issue or verify call asks the [`keys::KeySelector`] for the key with
//! the furthest expiration; tokens signed by an older key stop verifying as
//! soon as a newer one is stored.
//!
//! ## Modules
//!
//! - [`config`] - Token and signing key configuration
//! - [`keys`] - Key generation, records and current-key selection
//! - [`storage`] - Storage contract and in-memory store
//! - [`token`] - Token issuance and verification
//! - [`discovery`] - JWKS building and parsing
//! - [`rotation`] - Explicit key rotation
//! - [`middleware`] - Bearer extractor and error responses
//! - [`http`] - Axum HTTP handlers

pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod keys;
pub mod middleware;
pub mod rotation;
pub mod storage;
pub mod token;

pub use config::{AuthConfig, ConfigError, SigningConfig};
pub use discovery::{DiscoveryDocumentBuilder, Jwk, Jwks};
pub use error::{AuthError, ErrorCategory};
pub use http::{JwksState, jwks_handler};
pub use keys::{KeyError, KeySelector, SigningKeyRecord};
pub use middleware::{AuthState, BearerAuth};
pub use rotation::{KeyRotator, RotatedKey, RotationError};
pub use storage::{InMemorySigningKeyStore, SigningKeyStore, StorageError};
pub use token::{
    SigningAlgorithm, TokenClaims, TokenError, TokenIssuer, TokenSettings, TokenVerifier,
    verify_with_discovery,
};

/// Type alias for results surfaced to callers.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use keyward_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, SigningConfig};
    pub use crate::discovery::{DiscoveryDocumentBuilder, Jwk, Jwks};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::{JwksState, jwks_handler};
    pub use crate::keys::{KeyError, KeySelector, PublicKey, SigningKeyRecord};
    pub use crate::middleware::{AuthState, BearerAuth};
    pub use crate::rotation::{KeyRotator, RotatedKey, RotationError};
    pub use crate::storage::{InMemorySigningKeyStore, SigningKeyStore, StorageError};
    pub use crate::token::{
        SigningAlgorithm, TokenClaims, TokenError, TokenIssuer, TokenSettings, TokenVerifier,
    };
}
