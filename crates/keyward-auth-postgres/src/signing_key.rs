//! Signing key storage for PostgreSQL.
//!
//! Rows are immutable once inserted. Listed rows are turned into shared
//! records and remembered by `id`, so a key's decoded form survives across
//! requests just as it does with the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keyward_auth::keys::SigningKeyRecord;
use keyward_auth::storage::{SigningKeyStore, StorageError};
use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::Postgres;
use tokio::sync::Mutex;

use crate::{PgPool, storage_error};

type SigningKeyRow = (i64, String, String, i64);

/// PostgreSQL-backed [`SigningKeyStore`].
#[derive(Clone)]
pub struct PostgresSigningKeyStore {
    pool: Arc<PgPool>,
    records: Arc<Mutex<HashMap<i64, Arc<SigningKeyRecord>>>>,
}

impl PostgresSigningKeyStore {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(storage_error)?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the `signing_key` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        query(
            r#"
            CREATE TABLE IF NOT EXISTS signing_key (
                id BIGSERIAL PRIMARY KEY,
                private_key TEXT NOT NULL,
                public_key TEXT NOT NULL UNIQUE,
                expires_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        query("CREATE INDEX IF NOT EXISTS signing_key_expires_at_idx ON signing_key (expires_at DESC)")
            .execute(&*self.pool)
            .await
            .map_err(storage_error)?;

        tracing::debug!("signing_key schema ready");
        Ok(())
    }
}

#[async_trait]
impl SigningKeyStore for PostgresSigningKeyStore {
    async fn insert(&self, record: SigningKeyRecord) -> Result<(), StorageError> {
        let (id,): (i64,) = query_as(
            r#"
            INSERT INTO signing_key (private_key, public_key, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(record.private_pem())
        .bind(record.public_pem())
        .bind(record.expires_at())
        .fetch_one(&*self.pool)
        .await
        .map_err(storage_error)?;

        tracing::debug!(id, expires_at = record.expires_at(), "Stored signing key");
        self.records.lock().await.insert(id, Arc::new(record));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Arc<SigningKeyRecord>>, StorageError> {
        let rows: Vec<SigningKeyRow> = query_as(
            r#"
            SELECT id, private_key, public_key, expires_at
            FROM signing_key
            ORDER BY expires_at DESC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(storage_error)?;

        let mut cache = self.records.lock().await;
        Ok(rows
            .into_iter()
            .map(|(id, private_key, public_key, expires_at)| {
                cache
                    .entry(id)
                    .or_insert_with(|| {
                        Arc::new(SigningKeyRecord::from_parts(private_key, public_key, expires_at))
                    })
                    .clone()
            })
            .collect())
    }
}
