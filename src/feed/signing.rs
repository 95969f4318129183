//! Upstream request signing.
//!
//! The upstream authenticates requests with an RSA-PSS SHA-256 signature
//! over `timestamp || method || path`, shipped base64-encoded alongside
//! the key id and timestamp in three headers. Credentials load once at
//! session start and never mutate afterwards.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::pss::BlindedSigningKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding};
use rsa::RsaPrivateKey;
use sha2::Sha256;

use crate::errors::SigningError;

/// Header carrying the API key id.
pub const HEADER_KEY_ID: &str = "KALSHI-ACCESS-KEY";
/// Header carrying the base64 signature.
pub const HEADER_SIGNATURE: &str = "KALSHI-ACCESS-SIGNATURE";
/// Header carrying the millisecond timestamp that was signed.
pub const HEADER_TIMESTAMP: &str = "KALSHI-ACCESS-TIMESTAMP";

/// API credentials: key id plus RSA private key.
#[derive(Clone)]
pub struct FeedCredentials {
    key_id: String,
    private_key: RsaPrivateKey,
}

impl FeedCredentials {
    /// Build from a key id and a PEM private key (PKCS#8 or PKCS#1).
    pub fn new(key_id: impl Into<String>, private_key_pem: &str) -> Result<Self, SigningError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_key_pem))
            .map_err(|e| SigningError::PrivateKeyParse(e.to_string()))?;
        Ok(Self {
            key_id: key_id.into(),
            private_key,
        })
    }

    /// Load from `KALSHI_API_KEY_ID` and `KALSHI_PRIVATE_KEY_PEM`.
    pub fn from_env() -> Result<Self, SigningError> {
        let key_id = std::env::var("KALSHI_API_KEY_ID")
            .map_err(|_| SigningError::MissingCredential("KALSHI_API_KEY_ID".to_string()))?;
        let pem = std::env::var("KALSHI_PRIVATE_KEY_PEM")
            .map_err(|_| SigningError::MissingCredential("KALSHI_PRIVATE_KEY_PEM".to_string()))?;
        Self::new(key_id, &pem)
    }

    /// Sign `timestamp || method || path`, returning the base64 signature.
    pub fn sign(
        &self,
        timestamp_ms: u64,
        method: &str,
        path: &str,
    ) -> Result<String, SigningError> {
        let message = format!("{}{}{}", timestamp_ms, method.to_uppercase(), path);
        let signing_key = BlindedSigningKey::<Sha256>::new(self.private_key.clone());
        let mut rng = rand::thread_rng();
        let signature = signing_key
            .try_sign_with_rng(&mut rng, message.as_bytes())
            .map_err(|e| SigningError::Signature(e.to_string()))?;
        Ok(BASE64.encode(signature.to_bytes()))
    }

    /// The three authentication headers for one request.
    pub fn auth_headers(
        &self,
        method: &str,
        path: &str,
    ) -> Result<Vec<(String, String)>, SigningError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let signature = self.sign(timestamp_ms, method, path)?;
        Ok(vec![
            (HEADER_KEY_ID.to_string(), self.key_id.clone()),
            (HEADER_SIGNATURE.to_string(), signature),
            (HEADER_TIMESTAMP.to_string(), timestamp_ms.to_string()),
        ])
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl std::fmt::Debug for FeedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCredentials")
            .field("key_id", &"[REDACTED]")
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}
