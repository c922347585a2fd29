//
//  vend-client
//  auth/keyring.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Secure Token Storage
//!
//! Tokens are kept in the platform keyring (Keychain on macOS, Secret Service
//! on Linux, Credential Manager on Windows), one entry per value:
//!
//! | Key | Value |
//! |-----|-------|
//! | `{domain_prefix}` | access token |
//! | `{domain_prefix}.refresh` | refresh token |
//!
//! [`KeyringStore`] implements [`TokenListener`], so a [`Connection`](super::Connection)
//! with the store attached writes every refreshed token back to the keyring
//! before the retried request goes out.

use anyhow::Result;
use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::{TokenListener, TokenSet};

/// The service name identifying this application in the system keyring.
const SERVICE_NAME: &str = "vend-client";

/// Token storage in the system keyring.
///
/// # Example
///
/// ```rust,no_run
/// use vend_client::auth::KeyringStore;
///
/// fn example() -> anyhow::Result<()> {
///     let store = KeyringStore::new();
///     store.store("mystore", "access-token")?;
///
///     if let Some(token) = store.get("mystore")? {
///         println!("found token for mystore");
///     }
///     Ok(())
/// }
/// ```
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Keyring key of a store's refresh token.
    pub fn refresh_key(domain_prefix: &str) -> String {
        format!("{}.refresh", domain_prefix)
    }

    /// Creates or replaces the entry under `key`.
    pub fn store(&self, key: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)?;
        entry.set_password(secret)?;
        Ok(())
    }

    /// Returns `Ok(None)` when no entry exists.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, key)?;
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent; deleting a missing entry succeeds.
    pub fn delete(&self, key: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored access and refresh token of a store.
    pub fn load_tokens(&self, domain_prefix: &str) -> Result<(Option<String>, Option<String>)> {
        let access = self.get(domain_prefix)?;
        let refresh = self.get(&Self::refresh_key(domain_prefix))?;
        Ok((access, refresh))
    }

    /// Writes the access token, and the refresh token if one was issued.
    pub fn save_tokens(&self, domain_prefix: &str, tokens: &TokenSet) -> Result<()> {
        self.store(domain_prefix, &tokens.access_token)?;
        if let Some(refresh_token) = &tokens.refresh_token {
            self.store(&Self::refresh_key(domain_prefix), refresh_token)?;
        }
        Ok(())
    }

    /// Removes both entries of a store.
    pub fn clear_tokens(&self, domain_prefix: &str) -> Result<()> {
        self.delete(domain_prefix)?;
        self.delete(&Self::refresh_key(domain_prefix))
    }
}

#[async_trait]
impl TokenListener for KeyringStore {
    async fn token_updated(&self, domain_prefix: &str, tokens: &TokenSet) -> Result<()> {
        self.save_tokens(domain_prefix, tokens)?;
        debug!(domain_prefix, "persisted refreshed tokens to keyring");
        Ok(())
    }
}
