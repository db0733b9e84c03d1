// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Wallet signature verification.
//!
//! A wallet proves key possession by signing a server-provided nonce. Two
//! signing conventions are supported:
//!
//! - **Raw hash**: the signature covers `keccak256(nonce)` directly, the
//!   recovery byte is 0 or 1, and the recovered uncompressed public key
//!   (`0x04 || x || y`) must equal the claimed key byte for byte.
//! - **Prefixed message** (`personal_sign` / EIP-191): the signature covers
//!   `keccak256("\x19Ethereum Signed Message:\n" || len(nonce) || nonce)`,
//!   the recovery byte is 27 or 28, and the address derived from the
//!   recovered key must equal the claimed address.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{eip191_hash_message, hex, keccak256, Address};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// r (32) || s (32) || v (1)
const SIGNATURE_LEN: usize = 65;

/// Offset wallets add to the recovery id in prefixed-message signatures.
pub(crate) const LEGACY_RECOVERY_OFFSET: u8 = 27;

/// Signing convention expected from wallets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    /// keccak256 over the bare nonce, compared against the public key
    RawHash,
    /// EIP-191 prefixed message, compared against the address
    #[default]
    PrefixedMessage,
}

impl FromStr for SignatureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" | "raw-hash" | "raw_hash" => Ok(SignatureMode::RawHash),
            "prefixed" | "prefixed-message" | "prefixed_message" | "eip191" => {
                Ok(SignatureMode::PrefixedMessage)
            }
            other => Err(format!("unknown signature mode {other:?}")),
        }
    }
}

impl fmt::Display for SignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureMode::RawHash => write!(f, "raw"),
            SignatureMode::PrefixedMessage => write!(f, "prefixed"),
        }
    }
}

/// Wallet login request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignaturePayload {
    /// Nonce the wallet signed
    pub nonce: String,
    /// Hex-encoded 65-byte signature
    pub signature: String,
    /// Claimed wallet address (prefixed mode) or public key (raw mode), hex
    #[serde(
        rename = "walletPublicAddress",
        alias = "walletPublicKey",
        alias = "metaMaskWalletPublicKey"
    )]
    pub claimed: String,
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("{field} is not valid hex: {reason}")]
    InvalidHex { field: &'static str, reason: String },
    #[error("signature must be {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("unsupported recovery id {0}")]
    InvalidRecoveryId(u8),
    #[error("claimed wallet is invalid: {0}")]
    InvalidClaim(String),
}

/// Recovers the signer of a nonce and compares it with the claimed wallet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier {
    mode: SignatureMode,
}

impl SignatureVerifier {
    pub fn new(mode: SignatureMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// Check that `payload.signature` was produced by the claimed wallet.
    ///
    /// Returns `Err` only when the payload cannot be decoded. A well-formed
    /// signature from any other key, or one from which no key can be
    /// recovered, yields `Ok(false)`.
    pub fn verify(&self, payload: &SignaturePayload) -> Result<bool, SignatureError> {
        let signature = decode_hex("signature", &payload.signature)?;
        if signature.len() != SIGNATURE_LEN {
            return Err(SignatureError::InvalidLength(signature.len()));
        }
        let (rs, v) = signature.split_at(64);
        let recovery_byte = v[0];

        match self.mode {
            SignatureMode::RawHash => {
                let claimed_key = decode_hex("walletPublicKey", &payload.claimed)?;
                if recovery_byte > 1 {
                    return Err(SignatureError::InvalidRecoveryId(recovery_byte));
                }

                let prehash = keccak256(payload.nonce.as_bytes());
                let matched = recover_signer(prehash.as_slice(), rs, recovery_byte)
                    .map(|key| key.to_encoded_point(false).as_bytes() == claimed_key.as_slice())
                    .unwrap_or(false);
                Ok(matched)
            }
            SignatureMode::PrefixedMessage => {
                let claimed_address = parse_address(&payload.claimed)?;
                let recovery_id = match recovery_byte {
                    27 | 28 => recovery_byte - LEGACY_RECOVERY_OFFSET,
                    other => return Err(SignatureError::InvalidRecoveryId(other)),
                };

                let prehash = eip191_hash_message(payload.nonce.as_bytes());
                let matched = recover_signer(prehash.as_slice(), rs, recovery_id)
                    .map(|key| address_of(&key) == claimed_address)
                    .unwrap_or(false);
                Ok(matched)
            }
        }
    }

    /// Canonical form of a claimed wallet, used as the session identity key.
    ///
    /// EIP-55 checksummed address in prefixed mode, lowercase `0x` hex of
    /// the public key in raw mode.
    pub fn canonical_identity(&self, claimed: &str) -> Result<String, SignatureError> {
        match self.mode {
            SignatureMode::RawHash => {
                let key = decode_hex("walletPublicKey", claimed)?;
                Ok(hex::encode_prefixed(key))
            }
            SignatureMode::PrefixedMessage => Ok(parse_address(claimed)?.to_checksum(None)),
        }
    }
}

/// Ethereum address of a secp256k1 public key: last 20 bytes of
/// keccak256 over the uncompressed point without its `0x04` tag.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

fn recover_signer(prehash: &[u8], rs: &[u8], recovery_id: u8) -> Option<VerifyingKey> {
    let signature = Signature::from_slice(rs).ok()?;
    let recovery_id = RecoveryId::from_byte(recovery_id)?;

    match VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::debug!(error = %e, "Could not recover signer from signature");
            None
        }
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, SignatureError> {
    hex::decode(value).map_err(|e| SignatureError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

fn parse_address(value: &str) -> Result<Address, SignatureError> {
    Address::from_str(value).map_err(|e| SignatureError::InvalidClaim(e.to_string()))
}
