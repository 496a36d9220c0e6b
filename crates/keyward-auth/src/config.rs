//! Token and signing key configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "Secure Company"
//! jwks_url = "http://localhost:8080/jwks"
//! token_lifetime = "30d"
//!
//! [auth.signing]
//! algorithm = "RS256"
//! key_bits = 2048
//! key_lifetime = "365d"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::MIN_KEY_BITS;
use crate::token::SigningAlgorithm;

/// Longest token or key lifetime accepted from configuration (100 years).
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Root token configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim on issued tokens, and the only issuer accepted
    /// on verification.
    pub issuer: String,

    /// Public address of the discovery document, sent as the `jku` header.
    pub jwks_url: String,

    /// Validity window of issued tokens.
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,

    /// Signing key configuration.
    pub signing: SigningConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "Secure Company".to_string(),
            jwks_url: "http://localhost:8080/jwks".to_string(),
            token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
            signing: SigningConfig::default(),
        }
    }
}

/// Signing key configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Token signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// RSA modulus size for newly generated keys.
    pub key_bits: usize,

    /// Lifetime assigned to newly generated keys.
    #[serde(with = "humantime_serde")]
    pub key_lifetime: Duration,

    /// Refuse to issue tokens while the current key is past its expiry.
    pub reject_expired_signing_key: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::RS256,
            key_bits: MIN_KEY_BITS,
            key_lifetime: Duration::from_secs(365 * 24 * 3600), // 1 year
            reject_expired_signing_key: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - a lifetime is zero or longer than [`MAX_LIFETIME`]
    /// - the key size is below the minimum
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("auth.issuer".to_string()));
        }

        if self.token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token_lifetime must be > 0".to_string(),
            ));
        }

        if self.signing.key_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "signing.key_lifetime must be > 0".to_string(),
            ));
        }

        if self.token_lifetime > MAX_LIFETIME {
            return Err(ConfigError::InvalidValue(format!(
                "token_lifetime must not exceed {} seconds",
                MAX_LIFETIME.as_secs()
            )));
        }

        if self.signing.key_lifetime > MAX_LIFETIME {
            return Err(ConfigError::InvalidValue(format!(
                "signing.key_lifetime must not exceed {} seconds",
                MAX_LIFETIME.as_secs()
            )));
        }

        if self.signing.key_bits < MIN_KEY_BITS {
            return Err(ConfigError::InvalidValue(format!(
                "signing.key_bits must be at least {MIN_KEY_BITS}, got {}",
                self.signing.key_bits
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "Secure Company");
        assert_eq!(config.jwks_url, "http://localhost:8080/jwks");
        assert_eq!(config.token_lifetime, Duration::from_secs(2_592_000));
        assert_eq!(config.signing.algorithm, SigningAlgorithm::RS256);
        assert_eq!(config.signing.key_bits, 2048);
        assert!(config.signing.reject_expired_signing_key);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_issuer_fails_validation() {
        let mut config = AuthConfig::default();
        config.issuer = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_small_key_fails_validation() {
        let mut config = AuthConfig::default();
        config.signing.key_bits = 1024;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("key_bits"));
    }

    #[test]
    fn test_zero_lifetime_fails_validation() {
        let mut config = AuthConfig::default();
        config.token_lifetime = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = AuthConfig::default();
        config.signing.key_lifetime = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_excessive_lifetime_fails_validation() {
        let mut config = AuthConfig::default();
        config.token_lifetime = MAX_LIFETIME + Duration::from_secs(1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token_lifetime"));

        let mut config = AuthConfig::default();
        config.signing.key_lifetime = Duration::from_secs(20_000 * 365 * 24 * 3600);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("signing.key_lifetime"));

        let mut config = AuthConfig::default();
        config.signing.key_lifetime = MAX_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_humantime_fields() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "token_lifetime": "1h",
            "signing": { "key_lifetime": "90d", "algorithm": "RS512" }
        }))
        .unwrap();

        assert_eq!(config.token_lifetime, Duration::from_secs(3600));
        assert_eq!(config.signing.key_lifetime, Duration::from_secs(90 * 86_400));
        assert_eq!(config.signing.algorithm, SigningAlgorithm::RS512);
        assert_eq!(config.issuer, "Secure Company");
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result: Result<AuthConfig, _> = serde_json::from_value(serde_json::json!({
            "signing": { "algorithm": "HS256" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("required_field".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: required_field"
        );
    }
}
