//! Bearer token verification.
//!
//! Checks run in a fixed order so that each rejection carries the most
//! useful reason:
//!
//! 1. structure: three base64url segments, a JOSE header and a JSON payload
//! 2. expiry: `exp` must be strictly after now, even if the signature is bad
//! 3. signature: against the current signing key only
//! 4. issuer and remaining claims

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use super::TokenError;
use super::jwt::{TokenClaims, TokenSettings};
use crate::discovery::Jwks;
use crate::keys::KeySelector;

/// Validates presented bearer tokens against the current signing key.
///
/// Tokens signed by any older key are rejected with
/// [`TokenError::InvalidSignature`] once a newer key becomes current.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: KeySelector,
    settings: TokenSettings,
}

impl TokenVerifier {
    /// Creates a new verifier.
    #[must_use]
    pub fn new(keys: KeySelector, settings: TokenSettings) -> Self {
        Self { keys, settings }
    }

    /// Returns the verifier settings.
    #[must_use]
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Verifies `token` and returns its subject.
    ///
    /// # Errors
    ///
    /// Client faults: [`TokenError::MalformedToken`], [`TokenError::Expired`],
    /// [`TokenError::InvalidSignature`], [`TokenError::InvalidIssuer`] and
    /// [`TokenError::InvalidToken`]. Server faults: [`TokenError::NoSigningKey`],
    /// [`TokenError::Key`] and [`TokenError::Storage`].
    pub async fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc()).await
    }

    /// Verifies `token` as of `now` and returns its subject.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub async fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<String, TokenError> {
        self.verify_claims_at(token, now)
            .await
            .map(|claims| claims.email)
    }

    /// Verifies `token` as of `now` and returns all of its claims.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub async fn verify_claims_at(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<TokenClaims, TokenError> {
        check_structure_and_expiry(token, now)?;

        let record = self.keys.current().await?;
        let public_key = record.public_key()?;

        check_signature_and_claims(token, public_key.decoding_key(), &self.settings)
    }
}

/// Verifies `token` against a published discovery document instead of the
/// key store.
///
/// The key is looked up by the token's `kid` header. A document with a single
/// key is used as-is when the token carries no `kid`.
///
/// # Errors
///
/// Same client faults as [`TokenVerifier::verify`]; an unknown `kid` is
/// reported as [`TokenError::InvalidSignature`] and an unusable JWK as
/// [`TokenError::Key`].
pub fn verify_with_discovery(
    token: &str,
    jwks: &Jwks,
    settings: &TokenSettings,
    now: OffsetDateTime,
) -> Result<TokenClaims, TokenError> {
    check_structure_and_expiry(token, now)?;

    let header = decode_header(token)?;
    let jwk = match header.kid.as_deref() {
        Some(kid) => jwks.find(kid),
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
    .ok_or(TokenError::InvalidSignature)?;

    let decoding_key = jwk.decoding_key()?;
    check_signature_and_claims(token, &decoding_key, settings)
}

fn check_structure_and_expiry(token: &str, now: OffsetDateTime) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::malformed_token(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    decode_header(token)?;

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| TokenError::malformed_token(format!("payload is not base64url: {e}")))?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload)
        .map_err(|e| TokenError::malformed_token(format!("payload is not a JSON object: {e}")))?;

    let exp = match claims.get("exp") {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| TokenError::invalid_token("exp is not an integer"))?,
        None => return Err(TokenError::invalid_token("missing exp claim")),
    };

    if exp <= now.unix_timestamp() {
        return Err(TokenError::Expired);
    }

    Ok(())
}

fn check_signature_and_claims(
    token: &str,
    key: &DecodingKey,
    settings: &TokenSettings,
) -> Result<TokenClaims, TokenError> {
    let mut validation = Validation::new(settings.algorithm.to_jwt_algorithm());
    validation.set_issuer(&[&settings.issuer]);
    validation.set_required_spec_claims(&["exp", "iss"]);
    validation.validate_aud = false;
    // Expiry is checked against the caller's `now` before the signature.
    validation.validate_exp = false;
    validation.leeway = 0;

    let data = decode::<TokenClaims>(token, key, &validation).map_err(|e| match e.kind() {
        // The signature already matched, so a shape mismatch is a claim problem.
        ErrorKind::Json(_) => TokenError::invalid_token(e.to_string()),
        _ => TokenError::from(e),
    })?;

    if data.claims.email.is_empty() {
        return Err(TokenError::invalid_token("empty subject"));
    }

    Ok(data.claims)
}
