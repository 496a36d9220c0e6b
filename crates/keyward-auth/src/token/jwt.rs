//! JWT building blocks shared by the issuer and the verifier.
//!
//! ## Supported Algorithms
//!
//! Signing keys are always RSA, so only the RSASSA-PKCS1-v1_5 family is
//! offered:
//!
//! - **RS256**: RSA with SHA-256 (default, widely compatible)
//! - **RS384**: RSA with SHA-384
//! - **RS512**: RSA with SHA-512

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::keys::PublicKey;

/// Supported signing algorithms for bearer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// RSA with SHA-512.
    RS512,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::RS512 => Algorithm::RS512,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            other => Err(format!(
                "Unsupported signing algorithm '{other}'. Must be RS256, RS384, or RS512"
            )),
        }
    }
}

/// Claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Authenticated subject.
    pub email: String,
}

/// Fixed per-service values the issuer and verifier agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// Value of the `iss` claim.
    pub issuer: String,

    /// Algorithm used to sign and accepted on verify.
    pub algorithm: SigningAlgorithm,

    /// Address of the discovery document, sent as the `jku` header.
    pub jwks_url: String,

    /// Refuse to sign with a current key that is past its own expiry.
    pub reject_expired_signing_key: bool,
}

impl TokenSettings {
    /// Creates settings for `issuer` with RS256 and no `jku` header.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            algorithm: SigningAlgorithm::default(),
            jwks_url: String::new(),
            reject_expired_signing_key: true,
        }
    }

    /// Sets the signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the discovery document address.
    #[must_use]
    pub fn with_jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = jwks_url.into();
        self
    }

    /// Sets whether an expired current key may still sign.
    #[must_use]
    pub fn with_reject_expired_signing_key(mut self, reject: bool) -> Self {
        self.reject_expired_signing_key = reject;
        self
    }

    /// Builds the JOSE header for a token signed by `key`.
    #[must_use]
    pub fn header_for(&self, key: &PublicKey) -> Header {
        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.typ = Some("JWT".to_string());
        header.kid = Some(key.kid().to_string());
        if !self.jwks_url.is_empty() {
            header.jku = Some(self.jwks_url.clone());
        }
        header
    }
}

impl From<&AuthConfig> for TokenSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            algorithm: config.signing.algorithm,
            jwks_url: config.jwks_url.clone(),
            reject_expired_signing_key: config.signing.reject_expired_signing_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_algorithm_names() {
        assert_eq!(SigningAlgorithm::RS256.as_str(), "RS256");
        assert_eq!(SigningAlgorithm::RS384.to_string(), "RS384");
        assert_eq!(
            SigningAlgorithm::RS512.to_jwt_algorithm(),
            Algorithm::RS512
        );
        assert_eq!(SigningAlgorithm::default(), SigningAlgorithm::RS256);
    }

    #[test]
    fn test_signing_algorithm_from_str() {
        assert_eq!("RS384".parse::<SigningAlgorithm>(), Ok(SigningAlgorithm::RS384));
        assert!("HS256".parse::<SigningAlgorithm>().is_err());
        assert!("rs256".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn test_claims_serialization() {
        let claims = TokenClaims {
            iss: "Secure Company".to_string(),
            exp: 1_700_000_000,
            email: "a@x.com".to_string(),
        };

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["iss"], "Secure Company");
        assert_eq!(json["exp"], 1_700_000_000);
        assert_eq!(json["email"], "a@x.com");
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = AuthConfig::default();
        config.issuer = "issuer-x".to_string();
        config.jwks_url = "https://keys.example.com/jwks".to_string();
        config.signing.algorithm = SigningAlgorithm::RS384;

        let settings = TokenSettings::from(&config);
        assert_eq!(settings.issuer, "issuer-x");
        assert_eq!(settings.algorithm, SigningAlgorithm::RS384);
        assert_eq!(settings.jwks_url, "https://keys.example.com/jwks");
        assert!(settings.reject_expired_signing_key);
    }
}
