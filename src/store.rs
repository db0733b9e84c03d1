// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Koen

//! User record storage.
//!
//! Users are reachable by three keys: email (Google sign-in), wallet address
//! (wallet login) and page name (public profile slug). Each key is unique
//! across the store. Email and wallet keys compare case-insensitively.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use crate::auth::VerifiedIdentity;
use crate::models::User;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("a user with this {0} already exists")]
    AlreadyExists(&'static str),
    #[error("user store failure: {0}")]
    Internal(String),
}

/// Lookup key into the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Email(String),
    WalletAddress(String),
    PageName(String),
}

impl UserKey {
    /// Key under which the owner of `identity` is stored.
    ///
    /// `None` when the credential carries no usable key, such as a Google
    /// token issued without the `email` scope.
    pub fn for_identity(identity: &VerifiedIdentity) -> Option<Self> {
        match identity {
            VerifiedIdentity::External(claims) if !claims.email.trim().is_empty() => {
                Some(UserKey::Email(claims.email.clone()))
            }
            VerifiedIdentity::Session(claims) if !claims.sub.trim().is_empty() => {
                Some(UserKey::WalletAddress(claims.sub.clone()))
            }
            _ => None,
        }
    }
}

/// Persistence seam for user records.
pub trait UserStore: Send + Sync {
    /// Store `user` under a fresh id and return the id.
    fn create(&self, user: User) -> Result<String, StoreError>;

    fn read(&self, key: &UserKey) -> Result<User, StoreError>;
}

#[derive(Default)]
struct Users {
    by_id: HashMap<String, User>,
    by_email: HashMap<String, String>,
    by_wallet: HashMap<String, String>,
    by_page: HashMap<String, String>,
}

/// Process-local user store.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Users>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fold(key: &str) -> String {
    key.trim().to_lowercase()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("user store lock poisoned".to_string())
}

impl UserStore for InMemoryUserStore {
    fn create(&self, mut user: User) -> Result<String, StoreError> {
        let email = non_empty(user.email.as_deref()).map(fold);
        let wallet = non_empty(user.wallet_public_address.as_deref()).map(fold);
        let page = non_empty(Some(user.page_name.as_str())).map(str::to_string);

        let mut users = self.users.write().map_err(poisoned)?;

        if email.as_ref().is_some_and(|k| users.by_email.contains_key(k)) {
            return Err(StoreError::AlreadyExists("email"));
        }
        if wallet.as_ref().is_some_and(|k| users.by_wallet.contains_key(k)) {
            return Err(StoreError::AlreadyExists("wallet address"));
        }
        if page.as_ref().is_some_and(|k| users.by_page.contains_key(k)) {
            return Err(StoreError::AlreadyExists("page name"));
        }

        let id = Uuid::new_v4().to_string();
        user.id = id.clone();

        if let Some(email) = email {
            users.by_email.insert(email, id.clone());
        }
        if let Some(wallet) = wallet {
            users.by_wallet.insert(wallet, id.clone());
        }
        if let Some(page) = page {
            users.by_page.insert(page, id.clone());
        }
        users.by_id.insert(id.clone(), user);

        Ok(id)
    }

    fn read(&self, key: &UserKey) -> Result<User, StoreError> {
        let users = self.users.read().map_err(poisoned)?;

        let id = match key {
            UserKey::Email(email) => users.by_email.get(&fold(email)),
            UserKey::WalletAddress(wallet) => users.by_wallet.get(&fold(wallet)),
            UserKey::PageName(page) => users.by_page.get(page.trim()),
        }
        .ok_or(StoreError::NotFound)?;

        users.by_id.get(id).cloned().ok_or(StoreError::NotFound)
    }
}
