//! Key discovery document (JWKS).
//!
//! The document lists the public half of every stored key so third parties
//! can verify tokens without contacting this service per request. It is
//! rebuilt from the store contents each time it is requested.
//!
//! # References
//!
//! - [RFC 7517 - JSON Web Key](https://tools.ietf.org/html/rfc7517)
//! - [RFC 7638 - JWK Thumbprint](https://tools.ietf.org/html/rfc7638)

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::keys::{KeyError, PublicKey, SigningKeyRecord};
use crate::token::SigningAlgorithm;

/// JSON Web Key Set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Looks up a key by `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// JSON Web Key for an RSA signature key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA" for keys published here.
    pub kty: String,

    /// Key ID (RFC 7638 thumbprint).
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

impl Jwk {
    /// Builds the JWK for a decoded public key.
    #[must_use]
    pub fn from_public_key(key: &PublicKey, algorithm: SigningAlgorithm) -> Self {
        Self {
            kty: "RSA".to_string(),
            kid: key.kid().to_string(),
            use_: "sig".to_string(),
            alg: algorithm.as_str().to_string(),
            n: URL_SAFE_NO_PAD.encode(key.modulus()),
            e: URL_SAFE_NO_PAD.encode(key.exponent()),
        }
    }

    /// Converts a published key back into a verification key.
    ///
    /// # Errors
    ///
    /// [`KeyError::MalformedKey`] for a non-RSA entry, [`KeyError::KeyParse`]
    /// if the modulus or exponent is not valid base64url.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        if self.kty != "RSA" {
            return Err(KeyError::malformed_key(format!(
                "unsupported key type '{}'",
                self.kty
            )));
        }
        DecodingKey::from_rsa_components(&self.n, &self.e)
            .map_err(|e| KeyError::key_parse(format!("Invalid JWK components: {e}")))
    }
}

/// Renders stored records into a [`Jwks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryDocumentBuilder {
    algorithm: SigningAlgorithm,
}

impl DiscoveryDocumentBuilder {
    /// Creates a builder tagging entries with RS256.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the algorithm advertised on each entry.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builds the document, preserving record order.
    ///
    /// Records whose public half cannot be decoded are logged and left out;
    /// this never fails.
    #[must_use]
    pub fn build(&self, records: &[Arc<SigningKeyRecord>]) -> Jwks {
        let keys = records
            .iter()
            .filter_map(|record| match record.public_key() {
                Ok(key) => Some(Jwk::from_public_key(key, self.algorithm)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        expires_at = record.expires_at(),
                        "Skipping undecodable public key"
                    );
                    None
                }
            })
            .collect();

        Jwks { keys }
    }
}
