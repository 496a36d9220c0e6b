//! User directory consulted by the `/auth` and `/user` endpoints.
//!
//! Passwords are stored as Argon2id PHC strings; plaintext never leaves the
//! request that carried it.

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use serde::Serialize;

use crate::config::UserSeed;

/// Public view of an account, returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub location: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    /// A stored password hash is not a valid PHC string.
    #[error("Invalid password hash for '{email}': {message}")]
    InvalidHash { email: String, message: String },

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// The verification task did not complete.
    #[error("Password verification task failed: {0}")]
    Task(String),
}

/// Lookup and credential checks for accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the user if `email` exists and `password` matches.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, UserError>;

    /// Returns the user with this email, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
}

struct StoredUser {
    user: User,
    password_hash: String,
}

/// [`UserDirectory`] seeded from configuration.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: HashMap<String, StoredUser>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory, checking every hash parses.
    pub fn from_seeds(seeds: &[UserSeed]) -> Result<Self, UserError> {
        let mut directory = Self::new();
        for seed in seeds {
            PasswordHash::new(&seed.password_hash).map_err(|e| UserError::InvalidHash {
                email: seed.email.clone(),
                message: e.to_string(),
            })?;
            directory.users.insert(
                seed.email.clone(),
                StoredUser {
                    user: User {
                        id: seed.id,
                        email: seed.email.clone(),
                        name: seed.name.clone(),
                        location: seed.location.clone(),
                    },
                    password_hash: seed.password_hash.clone(),
                },
            );
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, UserError> {
        let Some(stored) = self.users.get(email) else {
            return Ok(None);
        };

        // Argon2 verification is CPU-bound.
        let hash = stored.password_hash.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| UserError::Task(e.to_string()))?
            .map_err(|e| UserError::InvalidHash {
                email: email.to_string(),
                message: e.to_string(),
            })?;

        Ok(matches.then(|| stored.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        Ok(self.users.get(email).map(|stored| stored.user.clone()))
    }
}

/// Hash a password for storage using Argon2id.
pub fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| UserError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash.
///
/// `Err` only if the hash format is invalid.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(email: &str, password: &str) -> UserSeed {
        UserSeed {
            id: 7,
            email: email.into(),
            name: "Ada".into(),
            location: "London".into(),
            password_hash: hash_password(password).unwrap(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let dir = InMemoryUserDirectory::from_seeds(&[seed("a@x.com", "pw")]).unwrap();

        let user = dir.authenticate("a@x.com", "pw").await.unwrap().unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.location, "London");

        assert!(dir.authenticate("a@x.com", "nope").await.unwrap().is_none());
        assert!(dir.authenticate("b@x.com", "pw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let dir = InMemoryUserDirectory::from_seeds(&[seed("a@x.com", "pw")]).unwrap();
        assert_eq!(dir.find_by_email("a@x.com").await.unwrap().unwrap().name, "Ada");
        assert!(dir.find_by_email("z@x.com").await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_seed_hash() {
        let mut bad = seed("a@x.com", "pw");
        bad.password_hash = "plaintext".into();
        let err = InMemoryUserDirectory::from_seeds(&[bad]).err().unwrap();
        assert!(matches!(err, UserError::InvalidHash { .. }));
    }

    #[test]
    fn test_user_json_has_no_password() {
        let json = serde_json::to_value(User {
            id: 1,
            email: "a@x.com".into(),
            name: String::new(),
            location: String::new(),
        })
        .unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "a@x.com");
    }
}
