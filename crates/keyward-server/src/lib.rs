//! HTTP front end for Keyward: credential exchange, the authenticated user
//! endpoint and the public key discovery document.

pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod users;

pub use config::{AppConfig, StorageBackend};
pub use observability::init_tracing;
pub use server::{AppState, build_app, build_state_with_store, rotate_keys, router, run};
pub use users::{InMemoryUserDirectory, User, UserDirectory, hash_password};
