// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and handed
//! to each component at construction.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8008` |
//! | `GOOGLE_CLIENT_ID` | OAuth client ID expected as token audience | Required |
//! | `GOOGLE_ISSUERS` | Comma-separated accepted token issuers | `accounts.google.com,https://accounts.google.com` |
//! | `GOOGLE_CERTS_URL` | Google signing certificate endpoint | `https://www.googleapis.com/oauth2/v1/certs` |
//! | `SESSION_SECRET` | HS256 secret for session tokens (at least 16 bytes) | Required |
//! | `SESSION_TTL_SECS` | Session token lifetime in seconds | `3000` |
//! | `SIGNATURE_MODE` | Wallet signature convention (`prefixed` or `raw`) | `prefixed` |
//! | `GATE_VERIFIERS` | Ordered verifiers tried by the credential gate | `session,external` |
//! | `STATIC_DIR` | Directory of the web app to serve | Unset (no static files) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::auth::external::{ExternalTokenConfig, GOOGLE_ISSUERS};
use crate::auth::gate::VerifierKind;
use crate::auth::keyring::GOOGLE_CERTS_URL;
use crate::auth::session::{SessionConfig, DEFAULT_SESSION_TTL, MIN_SECRET_LEN};
use crate::auth::signature::SignatureMode;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const GOOGLE_CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const GOOGLE_ISSUERS_ENV: &str = "GOOGLE_ISSUERS";
pub const GOOGLE_CERTS_URL_ENV: &str = "GOOGLE_CERTS_URL";
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SIGNATURE_MODE_ENV: &str = "SIGNATURE_MODE";
pub const GATE_VERIFIERS_ENV: &str = "GATE_VERIFIERS";
pub const STATIC_DIR_ENV: &str = "STATIC_DIR";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8008;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub external: ExternalTokenConfig,
    pub certs_url: String,
    pub session: SessionConfig,
    pub signature_mode: SignatureMode,
    pub gate_verifiers: Vec<VerifierKind>,
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let host: IpAddr = parse_or(get(HOST_ENV), HOST_ENV, DEFAULT_HOST.parse().ok())?;
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, Some(DEFAULT_PORT))?;

        let client_id = get(GOOGLE_CLIENT_ID_ENV).ok_or(ConfigError::Missing(GOOGLE_CLIENT_ID_ENV))?;
        let issuers = match get(GOOGLE_ISSUERS_ENV) {
            Some(list) => split_list(&list),
            None => GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
        };
        if issuers.is_empty() {
            return Err(invalid(GOOGLE_ISSUERS_ENV, "at least one issuer is required"));
        }

        let secret = get(SESSION_SECRET_ENV).ok_or(ConfigError::Missing(SESSION_SECRET_ENV))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(invalid(
                SESSION_SECRET_ENV,
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        let ttl_secs: u64 = parse_or(get(SESSION_TTL_ENV), SESSION_TTL_ENV, Some(DEFAULT_SESSION_TTL.as_secs()))?;
        if ttl_secs == 0 {
            return Err(invalid(SESSION_TTL_ENV, "must be positive"));
        }

        let signature_mode: SignatureMode = match get(SIGNATURE_MODE_ENV) {
            Some(mode) => mode
                .parse()
                .map_err(|e: String| invalid(SIGNATURE_MODE_ENV, e))?,
            None => SignatureMode::default(),
        };

        let gate_verifiers = match get(GATE_VERIFIERS_ENV) {
            Some(list) => split_list(&list)
                .iter()
                .map(|kind| kind.parse::<VerifierKind>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| invalid(GATE_VERIFIERS_ENV, e))?,
            None => vec![VerifierKind::Session, VerifierKind::External],
        };
        if gate_verifiers.is_empty() {
            return Err(invalid(GATE_VERIFIERS_ENV, "at least one verifier is required"));
        }

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            external: ExternalTokenConfig { client_id, issuers },
            certs_url: get(GOOGLE_CERTS_URL_ENV).unwrap_or_else(|| GOOGLE_CERTS_URL.to_string()),
            session: SessionConfig::new(secret, Duration::from_secs(ttl_secs)),
            signature_mode,
            gate_verifiers,
            static_dir: get(STATIC_DIR_ENV).map(PathBuf::from),
        })
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(var, e.to_string())),
        None => default.ok_or(ConfigError::Missing(var)),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
