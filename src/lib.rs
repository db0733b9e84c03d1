// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! Koen - Credential Gateway
//!
//! Authenticates Koen users with a Google ID token or an Ethereum wallet
//! signature and issues short-lived session tokens.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token and signature verification, credential gate
//! - `config` - Environment configuration
//! - `store` - User records

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
