//! HTTP endpoint handlers.
//!
//! - `GET /jwks` - [`jwks_handler`], the key discovery document

pub mod jwks;

pub use jwks::{JwksState, jwks_handler};
