//! Bearer token issuance.

use std::time::Duration;

use jsonwebtoken::encode;
use time::OffsetDateTime;

use super::TokenError;
use super::jwt::{TokenClaims, TokenSettings};
use crate::keys::{KeySelector, SigningKeyRecord};

/// Signs bearer tokens with the current signing key.
///
/// Stateless between calls; the key is re-resolved from the store every time
/// so a rotation takes effect on the next issuance.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: KeySelector,
    settings: TokenSettings,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(keys: KeySelector, settings: TokenSettings) -> Self {
        Self { keys, settings }
    }

    /// Returns the issuer settings.
    #[must_use]
    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issues a token for `subject` expiring at `expires_at`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::NoSigningKey`] if the store is empty
    /// - [`TokenError::Key`] if the current key cannot be decoded
    /// - [`TokenError::SigningKeyExpired`] if the current key is past expiry
    ///   and the settings forbid signing with it
    /// - [`TokenError::InvalidClaims`] for an empty subject or an expiry that
    ///   is not in the future
    /// - [`TokenError::Signing`] if the signature cannot be produced
    pub async fn issue(
        &self,
        subject: &str,
        expires_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let record = self.keys.current().await?;
        self.issue_with(&record, subject, expires_at)
    }

    /// Issues a token for `subject` valid for `lifetime` from now.
    ///
    /// # Errors
    ///
    /// Same as [`issue`](Self::issue).
    ///
    /// Lifetimes that push the expiry past the representable date range are
    /// refused with [`TokenError::InvalidClaims`].
    pub async fn issue_for(&self, subject: &str, lifetime: Duration) -> Result<String, TokenError> {
        let expires_at = time::Duration::try_from(lifetime)
            .ok()
            .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
            .ok_or_else(|| {
                TokenError::invalid_claims(format!("token lifetime {lifetime:?} is out of range"))
            })?;
        self.issue(subject, expires_at).await
    }

    /// Signs a token with a specific record instead of the store's current key.
    ///
    /// # Errors
    ///
    /// Same as [`issue`](Self::issue), minus store failures.
    pub fn issue_with(
        &self,
        record: &SigningKeyRecord,
        subject: &str,
        expires_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let now = OffsetDateTime::now_utc();

        if subject.is_empty() {
            return Err(TokenError::invalid_claims("subject must not be empty"));
        }

        let exp = expires_at.unix_timestamp();
        if exp <= now.unix_timestamp() {
            return Err(TokenError::invalid_claims(format!(
                "expiry {exp} is not in the future"
            )));
        }

        if self.settings.reject_expired_signing_key && record.is_expired_at(now) {
            tracing::error!(
                expired_at = record.expires_at(),
                "Current signing key has expired; rotate keys"
            );
            return Err(TokenError::SigningKeyExpired {
                expired_at: record.expires_at(),
            });
        }

        let encoding_key = record.encoding_key()?;
        let header = self.settings.header_for(record.public_key()?);

        let claims = TokenClaims {
            iss: self.settings.issuer.clone(),
            exp,
            email: subject.to_string(),
        };

        let token = encode(&header, &claims, encoding_key)
            .map_err(|e| TokenError::signing(e.to_string()))?;

        tracing::debug!(kid = ?header.kid, exp, "Issued token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use time::Duration as TimeDuration;

    use super::*;
    use crate::keys::{KeyError, MIN_KEY_BITS};
    use crate::storage::{InMemorySigningKeyStore, SigningKeyStore};

    const ISSUER: &str = "Secure Company";

    fn settings() -> TokenSettings {
        TokenSettings::new(ISSUER).with_jwks_url("http://localhost:8080/jwks")
    }

    async fn issuer_with_key(key_lifetime: TimeDuration) -> TokenIssuer {
        let store = Arc::new(InMemorySigningKeyStore::new());
        store
            .insert(
                SigningKeyRecord::generate(MIN_KEY_BITS, OffsetDateTime::now_utc() + key_lifetime)
                    .unwrap(),
            )
            .await
            .unwrap();
        TokenIssuer::new(KeySelector::new(store), settings())
    }

    fn decode_segment(token: &str, index: usize) -> serde_json::Value {
        let segment = token.split('.').nth(index).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_issue_produces_compact_jwt() {
        let issuer = issuer_with_key(TimeDuration::days(365)).await;
        let expires_at = OffsetDateTime::now_utc() + TimeDuration::days(30);

        let token = issuer.issue("a@x.com", expires_at).await.unwrap();
        assert_eq!(token.split('.').count(), 3);

        let header = decode_segment(&token, 0);
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");
        assert_eq!(header["jku"], "http://localhost:8080/jwks");
        assert!(header["kid"].is_string());

        let payload = decode_segment(&token, 1);
        assert_eq!(payload["iss"], ISSUER);
        assert_eq!(payload["email"], "a@x.com");
        assert_eq!(payload["exp"], expires_at.unix_timestamp());
    }

    #[tokio::test]
    async fn test_issue_empty_store() {
        let issuer = TokenIssuer::new(
            KeySelector::new(Arc::new(InMemorySigningKeyStore::new())),
            settings(),
        );
        let err = issuer
            .issue("a@x.com", OffsetDateTime::now_utc() + TimeDuration::days(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::NoSigningKey));
    }

    #[tokio::test]
    async fn test_issue_rejects_past_expiry() {
        let issuer = issuer_with_key(TimeDuration::days(365)).await;
        let err = issuer
            .issue("a@x.com", OffsetDateTime::now_utc() - TimeDuration::seconds(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims { .. }));
    }

    #[tokio::test]
    async fn test_issue_rejects_empty_subject() {
        let issuer = issuer_with_key(TimeDuration::days(365)).await;
        let err = issuer
            .issue_for("", std::time::Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims { .. }));
    }

    #[tokio::test]
    async fn test_issue_for_out_of_range_lifetime() {
        let issuer = issuer_with_key(TimeDuration::days(365)).await;
        let twenty_thousand_years = std::time::Duration::from_secs(20_000 * 365 * 86_400);

        let err = issuer
            .issue_for("a@x.com", twenty_thousand_years)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims { .. }));

        let err = issuer
            .issue_for("a@x.com", std::time::Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims { .. }));
    }

    #[tokio::test]
    async fn test_issue_refuses_expired_signing_key() {
        let issuer = issuer_with_key(TimeDuration::days(-1)).await;
        let err = issuer
            .issue_for("a@x.com", std::time::Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::SigningKeyExpired { .. }));
        assert!(err.is_server_error());
    }

    #[tokio::test]
    async fn test_issue_with_expired_key_when_allowed() {
        let store = Arc::new(InMemorySigningKeyStore::new());
        store
            .insert(
                SigningKeyRecord::generate(
                    MIN_KEY_BITS,
                    OffsetDateTime::now_utc() - TimeDuration::days(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let issuer = TokenIssuer::new(
            KeySelector::new(store),
            settings().with_reject_expired_signing_key(false),
        );

        assert!(
            issuer
                .issue_for("a@x.com", std::time::Duration::from_secs(60))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_issue_malformed_current_key() {
        let store = Arc::new(InMemorySigningKeyStore::new());
        store
            .insert(SigningKeyRecord::new(
                "garbage",
                "garbage",
                OffsetDateTime::now_utc() + TimeDuration::days(1),
            ))
            .await
            .unwrap();
        let issuer = TokenIssuer::new(KeySelector::new(store), settings());

        let err = issuer
            .issue_for("a@x.com", std::time::Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TokenError::Key(KeyError::MalformedKey { .. })
        ));
    }

    #[tokio::test]
    async fn test_issue_omits_jku_when_unset() {
        let store = Arc::new(InMemorySigningKeyStore::new());
        store
            .insert(
                SigningKeyRecord::generate(
                    MIN_KEY_BITS,
                    OffsetDateTime::now_utc() + TimeDuration::days(1),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        let issuer = TokenIssuer::new(KeySelector::new(store), TokenSettings::new(ISSUER));

        let token = issuer
            .issue_for("a@x.com", std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert!(decode_segment(&token, 0).get("jku").is_none());
    }
}
