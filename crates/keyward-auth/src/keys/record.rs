//! Persisted signing key records.
//!
//! A [`SigningKeyRecord`] is immutable once created. Decoding its PEM text
//! into usable key objects is deferred until first use and the result is kept
//! on the record, so a record shared through an `Arc` is parsed at most once
//! per instance. Two callers racing on the first decode both do the work and
//! one result is kept; decoding is deterministic so either result is correct.

use std::fmt;
use std::sync::OnceLock;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1::der::pem;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use super::generate::{KeyMaterial, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, generate_key_material};
use super::KeyError;

/// A stored key pair and its absolute expiration.
pub struct SigningKeyRecord {
    private_pem: String,
    public_pem: String,
    /// Unix timestamp, seconds.
    expires_at: i64,
    private_key: OnceLock<EncodingKey>,
    public_key: OnceLock<PublicKey>,
}

/// Decoded public half of a record.
#[derive(Clone)]
pub struct PublicKey {
    kid: String,
    n: Vec<u8>,
    e: Vec<u8>,
    decoding_key: DecodingKey,
}

impl PublicKey {
    fn from_rsa(public_key: &RsaPublicKey) -> Self {
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();
        let decoding_key = DecodingKey::from_rsa_raw_components(&n, &e);
        Self {
            kid: rsa_thumbprint(&n, &e),
            n,
            e,
            decoding_key,
        }
    }

    /// RFC 7638 thumbprint of the key, used as `kid`.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Big-endian modulus bytes.
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.n
    }

    /// Big-endian public exponent bytes.
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.e
    }

    /// Key usable by `jsonwebtoken` for signature checks.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("kid", &self.kid)
            .field("bits", &(self.n.len() * 8))
            .finish()
    }
}

impl SigningKeyRecord {
    /// Creates a record from PEM text and an absolute expiry.
    ///
    /// The expiry is truncated to whole seconds. Nothing is decoded here.
    #[must_use]
    pub fn new(
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self::from_parts(private_pem, public_pem, expires_at.unix_timestamp())
    }

    /// Creates a record from its stored columns.
    #[must_use]
    pub fn from_parts(
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            private_pem: private_pem.into(),
            public_pem: public_pem.into(),
            expires_at,
            private_key: OnceLock::new(),
            public_key: OnceLock::new(),
        }
    }

    /// Wraps freshly generated material.
    #[must_use]
    pub fn from_material(material: KeyMaterial, expires_at: OffsetDateTime) -> Self {
        Self::new(material.private_pem, material.public_pem, expires_at)
    }

    /// Generates a new key pair and wraps it in a record.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyGeneration`] if generation fails.
    pub fn generate(bits: usize, expires_at: OffsetDateTime) -> Result<Self, KeyError> {
        generate_key_material(bits).map(|material| Self::from_material(material, expires_at))
    }

    /// PEM-encoded private key.
    #[must_use]
    pub fn private_pem(&self) -> &str {
        &self.private_pem
    }

    /// PEM-encoded public key.
    #[must_use]
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    /// Expiration as a Unix timestamp in seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Returns `true` if the record's expiry is not after `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now.unix_timestamp()
    }

    /// Returns the decoded private key, parsing it on first use.
    ///
    /// # Errors
    ///
    /// [`KeyError::MalformedKey`] if the text is not an `RSA PRIVATE KEY`
    /// PEM block, [`KeyError::KeyParse`] if the payload is not a valid key.
    pub fn encoding_key(&self) -> Result<&EncodingKey, KeyError> {
        if let Some(key) = self.private_key.get() {
            return Ok(key);
        }

        let der = decode_block(&self.private_pem, PRIVATE_KEY_LABEL)?;
        RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| KeyError::key_parse(format!("Invalid private key: {e}")))?;
        let key = EncodingKey::from_rsa_der(&der);

        Ok(self.private_key.get_or_init(|| key))
    }

    /// Returns the decoded public key, parsing it on first use.
    ///
    /// # Errors
    ///
    /// [`KeyError::MalformedKey`] if the text is not a `PUBLIC KEY` PEM
    /// block, [`KeyError::KeyParse`] if the payload is not a valid RSA key.
    pub fn public_key(&self) -> Result<&PublicKey, KeyError> {
        if let Some(key) = self.public_key.get() {
            return Ok(key);
        }

        let der = decode_block(&self.public_pem, PUBLIC_KEY_LABEL)?;
        let rsa_key = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| KeyError::key_parse(format!("Invalid public key: {e}")))?;
        let key = PublicKey::from_rsa(&rsa_key);

        Ok(self.public_key.get_or_init(|| key))
    }

    /// Returns `true` if both halves have already been decoded.
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.private_key.get().is_some() && self.public_key.get().is_some()
    }
}

impl fmt::Debug for SigningKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyRecord")
            .field("expires_at", &self.expires_at)
            .field("private_pem", &"<redacted>")
            .field("decoded", &self.is_decoded())
            .finish()
    }
}

/// Decodes a PEM block and checks its label.
fn decode_block(text: &str, expected_label: &str) -> Result<Vec<u8>, KeyError> {
    let (label, der) = pem::decode_vec(text.as_bytes())
        .map_err(|e| KeyError::malformed_key(format!("Not a PEM block: {e}")))?;

    if label != expected_label {
        return Err(KeyError::malformed_key(format!(
            "Expected a '{expected_label}' block, found '{label}'"
        )));
    }

    Ok(der)
}

/// RFC 7638 JWK thumbprint of an RSA public key.
fn rsa_thumbprint(n: &[u8], e: &[u8]) -> String {
    // Members in lexicographic order, no whitespace.
    let canonical = format!(
        r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
        URL_SAFE_NO_PAD.encode(e),
        URL_SAFE_NO_PAD.encode(n)
    );
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}
