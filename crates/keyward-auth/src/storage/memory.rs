//! In-memory signing key store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SigningKeyStore, StorageError};
use crate::keys::{SigningKeyRecord, sort_newest_first};

/// Process-local [`SigningKeyStore`].
///
/// Keeps records sorted newest-expiry-first on insert and hands out shared
/// `Arc`s, so decoded keys are reused across calls.
#[derive(Debug, Default)]
pub struct InMemorySigningKeyStore {
    records: RwLock<Vec<Arc<SigningKeyRecord>>>,
}

impl InMemorySigningKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = SigningKeyRecord>) -> Self {
        let mut records: Vec<_> = records.into_iter().map(Arc::new).collect();
        sort_newest_first(&mut records);
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SigningKeyStore for InMemorySigningKeyStore {
    async fn insert(&self, record: SigningKeyRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;

        if records
            .iter()
            .any(|existing| existing.public_pem() == record.public_pem())
        {
            return Err(StorageError::duplicate("public key already stored"));
        }

        // Insert after every record expiring at or after this one.
        let position = records.partition_point(|r| r.expires_at() >= record.expires_at());
        records.insert(position, Arc::new(record));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Arc<SigningKeyRecord>>, StorageError> {
        Ok(self.records.read().await.clone())
    }
}
