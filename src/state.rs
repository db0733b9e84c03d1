// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

use std::sync::Arc;

use crate::auth::{
    CredentialGate, ExternalTokenVerifier, HttpKeyRing, KeyRing, KeyRingError,
    SessionTokenIssuer, SessionTokenVerifier, SignatureVerifier,
};
use crate::config::Config;
use crate::store::{InMemoryUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub key_ring: Arc<dyn KeyRing>,
    pub gate: CredentialGate,
    pub signatures: SignatureVerifier,
    pub sessions: SessionTokenIssuer,
}

impl AppState {
    /// Build the state with Google's HTTPS key ring.
    pub fn from_config(config: &Config) -> Result<Self, KeyRingError> {
        let key_ring = HttpKeyRing::new(config.certs_url.clone())?;
        Ok(Self::with_key_ring(config, Arc::new(key_ring)))
    }

    pub fn with_key_ring(config: &Config, key_ring: Arc<dyn KeyRing>) -> Self {
        let gate = CredentialGate::new(config.gate_verifiers.clone())
            .with_session(SessionTokenVerifier::new(&config.session))
            .with_external(ExternalTokenVerifier::new(
                config.external.clone(),
                Arc::clone(&key_ring),
            ));

        Self {
            users: Arc::new(InMemoryUserStore::new()),
            key_ring,
            gate,
            signatures: SignatureVerifier::new(config.signature_mode),
            sessions: SessionTokenIssuer::new(&config.session),
        }
    }

    pub fn with_user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = users;
        self
    }
}
