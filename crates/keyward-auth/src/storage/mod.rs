//! Storage contract for signing key records.
//!
//! The core only needs two operations from persistence: append a record and
//! list every record newest-expiry-first. Records are never updated or
//! deleted through this interface.
//!
//! # Implementations
//!
//! - [`InMemorySigningKeyStore`] - process-local store, used in tests and for
//!   single-process deployments
//! - `keyward-auth-postgres` - PostgreSQL storage backend

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::keys::SigningKeyRecord;

pub use memory::InMemorySigningKeyStore;

/// Errors reported by a [`SigningKeyStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// A record with the same key material already exists.
    #[error("Duplicate signing key: {message}")]
    Duplicate {
        /// Description of the conflict.
        message: String,
    },

    /// The backing store failed to read or write.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Duplicate` error.
    #[must_use]
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a `Duplicate` error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Persistence of signing key records.
///
/// # Ordering
///
/// [`list_all`](Self::list_all) must return records sorted by expiration,
/// latest first. Callers that select the current key re-check the order, so
/// a store that cannot sort is still correct, only slower.
///
/// # Caching
///
/// Records are handed out behind `Arc`. A store that returns the same `Arc`
/// on every call lets the decoded-key cache on each record survive across
/// requests; a store that rebuilds records per call decodes per call.
#[async_trait]
pub trait SigningKeyStore: Send + Sync {
    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Duplicate`] if the same public key is already stored
    /// - [`StorageError::Backend`] if the write fails
    async fn insert(&self, record: SigningKeyRecord) -> Result<(), StorageError>;

    /// Lists every stored record, newest expiration first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the read fails.
    async fn list_all(&self) -> Result<Vec<Arc<SigningKeyRecord>>, StorageError>;
}
