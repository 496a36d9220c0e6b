//! Selection of the current signing key.
//!
//! The current key is the record with the latest expiration. Stores are
//! expected to list records newest-expiry-first, but selection does not rely
//! on it: it scans for the maximum and keeps the earliest of equal entries,
//! which is the same record a correctly ordered listing would put first.

use std::sync::Arc;

use crate::storage::{SigningKeyStore, StorageError};
use crate::token::TokenError;

use super::SigningKeyRecord;

/// Picks the record with the furthest expiration, or `None` if empty.
///
/// Whether that record has itself expired is not checked here.
#[must_use]
pub fn select_current(records: &[Arc<SigningKeyRecord>]) -> Option<&Arc<SigningKeyRecord>> {
    records.iter().reduce(|best, candidate| {
        if candidate.expires_at() > best.expires_at() {
            candidate
        } else {
            best
        }
    })
}

/// Sorts records newest-expiry-first, keeping store order among equals.
pub fn sort_newest_first(records: &mut [Arc<SigningKeyRecord>]) {
    records.sort_by(|a, b| b.expires_at().cmp(&a.expires_at()));
}

/// Resolves the current key from a [`SigningKeyStore`].
///
/// Holds no state besides the store handle; records returned by the store
/// carry their own decoded-key cache.
#[derive(Clone)]
pub struct KeySelector {
    store: Arc<dyn SigningKeyStore>,
}

impl KeySelector {
    /// Creates a selector over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SigningKeyStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SigningKeyStore> {
        &self.store
    }

    /// Lists every stored record, newest expiration first.
    ///
    /// # Errors
    ///
    /// Returns the store's error if listing fails.
    pub async fn all(&self) -> Result<Vec<Arc<SigningKeyRecord>>, StorageError> {
        let mut records = self.store.list_all().await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// Returns the record currently authoritative for signing.
    ///
    /// # Errors
    ///
    /// - [`TokenError::NoSigningKey`] if the store is empty
    /// - [`TokenError::Storage`] if listing fails
    pub async fn current(&self) -> Result<Arc<SigningKeyRecord>, TokenError> {
        let records = self.store.list_all().await?;
        select_current(&records)
            .cloned()
            .ok_or(TokenError::NoSigningKey)
    }
}
