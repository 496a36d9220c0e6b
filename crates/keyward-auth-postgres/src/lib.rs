//! PostgreSQL storage backend for Keyward signing keys.
//!
//! Stores key records in a single append-only `signing_key` table:
//!
//! ```sql
//! CREATE TABLE signing_key (
//!     id          BIGSERIAL PRIMARY KEY,
//!     private_key TEXT   NOT NULL,
//!     public_key  TEXT   NOT NULL UNIQUE,
//!     expires_at  BIGINT NOT NULL
//! );
//! ```
//!
//! # Example
//!
//! ```ignore
//! use keyward_auth_postgres::PostgresSigningKeyStore;
//!
//! let store = PostgresSigningKeyStore::connect("postgres://localhost/keyward", 5).await?;
//! store.ensure_schema().await?;
//! ```

pub mod signing_key;

use keyward_auth::StorageError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use signing_key::PostgresSigningKeyStore;

/// Converts a database error into the storage contract's error.
///
/// Unique violations become [`StorageError::Duplicate`]; everything else is a
/// backend failure.
#[must_use]
pub fn storage_error(err: sqlx_core::Error) -> StorageError {
    if let sqlx_core::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StorageError::duplicate(db_err.message().to_string());
    }
    StorageError::backend(err.to_string())
}
