//! Signing key lifecycle.
//!
//! - [`generate`] - fresh RSA key pairs rendered as PEM text
//! - [`record`] - persisted key records with lazily decoded key views
//! - [`selector`] - choosing the single key that is current for signing

pub mod generate;
pub mod record;
pub mod selector;

pub use generate::{
    KeyMaterial, MIN_KEY_BITS, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, generate_key_material,
};
pub use record::{PublicKey, SigningKeyRecord};
pub use selector::{KeySelector, select_current, sort_newest_first};

/// Errors raised while generating or decoding signing keys.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyError {
    /// The randomness source or the PEM encoder failed.
    #[error("Key generation error: {message}")]
    KeyGeneration {
        /// Description of the generation failure.
        message: String,
    },

    /// The stored text is not a well-formed PEM block of the expected type.
    #[error("Malformed key: {message}")]
    MalformedKey {
        /// Description of what is wrong with the block.
        message: String,
    },

    /// The PEM block is well formed but its payload is not a valid key.
    #[error("Key parse error: {message}")]
    KeyParse {
        /// Description of the parse failure.
        message: String,
    },
}

impl KeyError {
    /// Creates a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration {
            message: message.into(),
        }
    }

    /// Creates a new `MalformedKey` error.
    #[must_use]
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }

    /// Creates a new `KeyParse` error.
    #[must_use]
    pub fn key_parse(message: impl Into<String>) -> Self {
        Self::KeyParse {
            message: message.into(),
        }
    }

    /// Returns `true` if the error comes from persisted key material
    /// rather than from generating a new key.
    #[must_use]
    pub fn is_corrupt_key(&self) -> bool {
        matches!(self, Self::MalformedKey { .. } | Self::KeyParse { .. })
    }
}
