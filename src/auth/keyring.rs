// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Identity provider signing keys.
//!
//! Google publishes its current ID token signing certificates at
//! `https://www.googleapis.com/oauth2/v1/certs` as a JSON object mapping key
//! id to PEM. Keys rotate, so the set is fetched again for every lookup.
//! Nothing is cached between requests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use thiserror::Error;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Google's v1 certificate endpoint (key id → PEM certificate).
pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

/// Outbound request timeout for the certificate endpoint.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Key id → PEM-encoded public key material.
pub type SigningKeySet = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum KeyRingError {
    #[error("no key with id {0:?} in key ring")]
    NotFound(String),
    #[error("key ring fetch failed: {0}")]
    Network(String),
    #[error("key ring material is malformed: {0}")]
    Malformed(String),
}

/// Source of the identity provider's public signing keys.
#[async_trait]
pub trait KeyRing: Send + Sync {
    /// Retrieve the current key set.
    async fn keys(&self) -> Result<SigningKeySet, KeyRingError>;

    /// Retrieve the PEM for a single key id.
    async fn fetch(&self, kid: &str) -> Result<String, KeyRingError> {
        let mut keys = self.keys().await?;
        keys.remove(kid)
            .ok_or_else(|| KeyRingError::NotFound(kid.to_string()))
    }
}

/// Key ring backed by the provider's HTTPS endpoint.
#[derive(Clone)]
pub struct HttpKeyRing {
    certs_url: String,
    client: reqwest::Client,
}

impl HttpKeyRing {
    /// Create a key ring reading from `certs_url`.
    pub fn new(certs_url: impl Into<String>) -> Result<Self, KeyRingError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| KeyRingError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            certs_url: certs_url.into(),
            client,
        })
    }

    pub fn certs_url(&self) -> &str {
        &self.certs_url
    }
}

#[async_trait]
impl KeyRing for HttpKeyRing {
    async fn keys(&self) -> Result<SigningKeySet, KeyRingError> {
        let response = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| KeyRingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeyRingError::Network(format!(
                "HTTP {} from certificate endpoint",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| KeyRingError::Network(e.to_string()))?;

        let keys: SigningKeySet =
            serde_json::from_slice(&body).map_err(|e| KeyRingError::Malformed(e.to_string()))?;

        tracing::debug!(url = %self.certs_url, keys = keys.len(), "Fetched provider key ring");
        Ok(keys)
    }
}

/// Key ring with a fixed set of keys.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyRing {
    keys: SigningKeySet,
}

impl StaticKeyRing {
    pub fn new(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

#[async_trait]
impl KeyRing for StaticKeyRing {
    async fn keys(&self) -> Result<SigningKeySet, KeyRingError> {
        Ok(self.keys.clone())
    }
}

/// Convert PEM key material into an RSA verification key.
///
/// Accepts X.509 certificates (what Google serves) as well as bare
/// `PUBLIC KEY` / `RSA PUBLIC KEY` blocks.
pub fn decoding_key_from_pem(pem_text: &str) -> Result<DecodingKey, KeyRingError> {
    // `::pem` avoids the `pem` module re-exported by the x509-parser prelude.
    let block = ::pem::parse(pem_text)
        .map_err(|e| KeyRingError::Malformed(format!("invalid PEM: {e}")))?;

    match block.tag() {
        "CERTIFICATE" => {
            let (_, cert) = X509Certificate::from_der(block.contents())
                .map_err(|e| KeyRingError::Malformed(format!("invalid certificate: {e}")))?;

            match cert.public_key().parsed() {
                Ok(PublicKey::RSA(rsa)) => Ok(DecodingKey::from_rsa_raw_components(
                    rsa.modulus,
                    rsa.exponent,
                )),
                Ok(_) => Err(KeyRingError::Malformed(
                    "certificate does not carry an RSA key".to_string(),
                )),
                Err(e) => Err(KeyRingError::Malformed(format!(
                    "unreadable certificate key: {e}"
                ))),
            }
        }
        "PUBLIC KEY" | "RSA PUBLIC KEY" => DecodingKey::from_rsa_pem(pem_text.as_bytes())
            .map_err(|e| KeyRingError::Malformed(format!("invalid RSA key: {e}"))),
        other => Err(KeyRingError::Malformed(format!("unsupported PEM block {other:?}"))),
    }
}
