//! HTTP middleware for bearer authentication.
//!
//! - [`BearerAuth`] extracts and verifies the `Authorization: Bearer` token
//! - [`AuthError`](crate::error::AuthError) renders as a JSON error response
//!   with a `WWW-Authenticate` challenge on 401

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth};
pub use error::error_json;
