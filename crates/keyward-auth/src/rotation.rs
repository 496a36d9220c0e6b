//! Explicit signing key rotation.
//!
//! Rotation never happens implicitly during issuance or verification; it is
//! invoked by an operator command or at startup when the store is empty.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::config::SigningConfig;
use crate::keys::{KeyError, MIN_KEY_BITS, SigningKeyRecord};
use crate::storage::{SigningKeyStore, StorageError};

/// Errors that can occur during rotation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RotationError {
    /// Key generation failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The new record could not be stored.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The key lifetime pushes the expiry out of the representable range.
    #[error("Invalid key lifetime: {message}")]
    Lifetime {
        /// Description of the rejected lifetime.
        message: String,
    },

    /// The blocking generation task did not complete.
    #[error("Key generation task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}

/// Summary of a key that was rotated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedKey {
    /// Thumbprint of the new key.
    pub kid: String,

    /// Expiration of the new key, Unix seconds.
    pub expires_at: i64,
}

/// Generates and stores new signing keys.
#[derive(Clone)]
pub struct KeyRotator {
    store: Arc<dyn SigningKeyStore>,
    key_bits: usize,
    key_lifetime: Duration,
}

impl KeyRotator {
    /// Creates a rotator producing `key_bits` keys valid for `key_lifetime`.
    ///
    /// Sizes below [`MIN_KEY_BITS`] are raised to it.
    #[must_use]
    pub fn new(store: Arc<dyn SigningKeyStore>, key_bits: usize, key_lifetime: Duration) -> Self {
        Self {
            store,
            key_bits: key_bits.max(MIN_KEY_BITS),
            key_lifetime,
        }
    }

    /// Creates a rotator from signing configuration.
    #[must_use]
    pub fn from_config(store: Arc<dyn SigningKeyStore>, config: &SigningConfig) -> Self {
        Self::new(store, config.key_bits, config.key_lifetime)
    }

    /// Overrides the lifetime of keys produced by this rotator.
    #[must_use]
    pub fn with_key_lifetime(mut self, key_lifetime: Duration) -> Self {
        self.key_lifetime = key_lifetime;
        self
    }

    /// Generates a key expiring `key_lifetime` from now and stores it.
    ///
    /// Generation runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::Lifetime`] if the expiry cannot be represented,
    /// or an error if generation, the generation task or the insert fails.
    pub async fn rotate(&self) -> Result<RotatedKey, RotationError> {
        let bits = self.key_bits;
        let expires_at = time::Duration::try_from(self.key_lifetime)
            .ok()
            .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
            .ok_or_else(|| RotationError::Lifetime {
                message: format!("{:?} is out of range", self.key_lifetime),
            })?;

        let record = tokio::task::spawn_blocking(move || SigningKeyRecord::generate(bits, expires_at))
            .await
            .map_err(|e| RotationError::Task {
                message: e.to_string(),
            })??;

        let rotated = RotatedKey {
            kid: record.public_key()?.kid().to_string(),
            expires_at: record.expires_at(),
        };

        self.store.insert(record).await?;

        tracing::info!(
            kid = %rotated.kid,
            expires_at = rotated.expires_at,
            bits,
            "Rotated in new signing key"
        );
        Ok(rotated)
    }

    /// Rotates only if the store holds no key at all.
    ///
    /// # Errors
    ///
    /// Same as [`rotate`](Self::rotate), plus a failed store read.
    pub async fn rotate_if_empty(&self) -> Result<Option<RotatedKey>, RotationError> {
        if !self.store.list_all().await?.is_empty() {
            return Ok(None);
        }
        tracing::info!("Key store is empty, generating initial signing key");
        self.rotate().await.map(Some)
    }
}
