//! CLOB API credentials and L2 request signing.

use anyhow::{anyhow, Result};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE as BASE64_URL_SAFE},
    Engine,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API key triple issued by the CLOB for a signing key.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreds {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl ApiCreds {
    pub fn new(api_key: String, secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret,
            passphrase,
        }
    }

    /// HMAC-SHA256 over `{timestamp}{method}{path}{body}`.
    ///
    /// The secret is URL-safe base64; the signature is returned the same way.
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
        let secret_bytes = BASE64_URL_SAFE
            .decode(&self.secret)
            .or_else(|_| BASE64.decode(&self.secret))
            .map_err(|e| anyhow!("Invalid base64 API secret: {}", e))?;

        let message = format!("{timestamp}{method}{path}{body}");

        let mut mac = HmacSha256::new_from_slice(&secret_bytes)
            .map_err(|e| anyhow!("HMAC key rejected: {}", e))?;
        mac.update(message.as_bytes());

        Ok(BASE64_URL_SAFE.encode(mac.finalize().into_bytes()))
    }
}
