//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use keyward_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(subject): BearerAuth) -> String {
//!     format!("Hello, {subject}!")
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::token::TokenVerifier;

/// State required for bearer token authentication.
///
/// Include it in the application state and expose it to [`BearerAuth`]
/// via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// Verifier for presented tokens.
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

/// Axum extractor that validates a bearer token and yields its subject.
///
/// # Errors
///
/// Rejects with [`AuthError::BadRequest`] when the `Authorization` header is
/// absent or is not a `<scheme> <credential>` pair, and with the opaque
/// [`AuthError::Unauthorized`] for any token fault.
pub struct BearerAuth(pub String);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::bad_request("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AuthError::bad_request("Authorization header is not valid ASCII"))?;

        let token = parse_bearer(header)?;

        let subject = auth_state.verifier.verify(token).await?;

        tracing::debug!(subject = %subject, "Token validated successfully");
        Ok(BearerAuth(subject))
    }
}

/// Splits an `Authorization` header value into its bearer credential.
///
/// A value without a scheme and credential is a malformed request; any other
/// scheme is treated as a rejected credential.
fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let (scheme, credential) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::bad_request("Malformed Authorization header"))?;

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthError::bad_request("Malformed Authorization header"));
    }

    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(scheme, "Unsupported authorization scheme");
        return Err(AuthError::invalid_token());
    }

    Ok(credential)
}
