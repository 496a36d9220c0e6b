//! JWKS endpoint HTTP handler.
//!
//! Serves the key discovery document referenced by the `jku` header of
//! issued tokens. The document is rebuilt from the key store on every
//! request and marked as not cacheable, so a rotation is visible at once.
//!
//! # Example Response
//!
//! ```json
//! {
//!   "keys": [
//!     {
//!       "kty": "RSA",
//!       "kid": "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs",
//!       "use": "sig",
//!       "alg": "RS256",
//!       "n": "base64url-encoded-modulus",
//!       "e": "AQAB"
//!     }
//!   ]
//! }
//! ```

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::discovery::DiscoveryDocumentBuilder;
use crate::error::AuthError;
use crate::keys::KeySelector;

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// Source of stored key records.
    pub keys: KeySelector,

    /// Renders records into the document.
    pub builder: DiscoveryDocumentBuilder,
}

impl JwksState {
    /// Creates a new JWKS state.
    pub fn new(keys: KeySelector, builder: DiscoveryDocumentBuilder) -> Self {
        Self { keys, builder }
    }
}

/// Handler for `GET /jwks`.
///
/// # Errors
///
/// Returns 500 if the key store cannot be read. Individual undecodable keys
/// are left out of the document instead.
pub async fn jwks_handler(State(state): State<JwksState>) -> Result<impl IntoResponse, AuthError> {
    let records = state.keys.all().await?;
    let jwks = state.builder.build(&records);

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Json(jwks),
    ))
}
