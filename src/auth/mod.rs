//
//  vend-client
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication Module
//!
//! This module owns the session state every API call is made with and the
//! OAuth 2.0 token refresh that keeps it valid.
//!
//! ## Overview
//!
//! - [`ConnectionInfo`]: the credentials and routing info of one store session
//! - [`Connection`]: a cloneable handle to the shared, mutable `ConnectionInfo`
//! - [`TokenListener`]: hook invoked after every successful refresh, used to
//!   persist rotated tokens (see [`KeyringStore`])
//! - [`oauth`]: the token endpoint calls (refresh and code exchange)
//!
//! ## Ownership
//!
//! The application creates one [`Connection`] per session and shares it with
//! every client. Only the refresh path writes to it, and only the
//! `access_token` and `refresh_token` fields; everything else reads
//! snapshots. Refreshes are serialized by a mutex so that concurrent calls
//! hitting a 401 at the same time trigger a single refresh.
//!
//! ## Example
//!
//! ```rust
//! use vend_client::auth::{Connection, ConnectionInfo};
//!
//! # tokio_test::block_on(async {
//! let info = ConnectionInfo::new("mystore", "access-token")
//!     .with_refresh_token("refresh-token")
//!     .with_token_service(
//!         "https://{DOMAIN_PREFIX}.vendhq.com/api/1.0/token",
//!         "client-id",
//!         "client-secret",
//!     );
//! let connection = Connection::new(info);
//! assert_eq!(connection.snapshot().await.domain_prefix, "mystore");
//! # });
//! ```

mod keyring;
pub mod oauth;

pub use self::keyring::*;
pub use oauth::{
    exchange_code, refresh_access_token, token_endpoint, RefreshCredentials, TokenSet,
    DOMAIN_PREFIX_PLACEHOLDER,
};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::api::common::ApiError;

/// Host suffix of every store's API: `https://{domain_prefix}.vendhq.com`.
pub const DEFAULT_API_HOST: &str = "vendhq.com";

/// Credentials and routing info of one store session.
///
/// `Debug` output masks tokens and the client secret.
#[derive(Clone, Default, PartialEq)]
pub struct ConnectionInfo {
    /// The store's subdomain, e.g. `mystore` for `mystore.vendhq.com`.
    pub domain_prefix: String,
    /// Bearer token sent with every request.
    pub access_token: String,
    /// Token used to obtain a new access token.
    pub refresh_token: Option<String>,
    /// Token endpoint; may contain the `{DOMAIN_PREFIX}` placeholder.
    pub token_service_url: Option<String>,
    /// OAuth client id.
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// Overrides `https://{domain_prefix}.vendhq.com`, e.g. for a proxy.
    pub api_base: Option<String>,
}

impl ConnectionInfo {
    pub fn new(domain_prefix: &str, access_token: &str) -> Self {
        Self {
            domain_prefix: domain_prefix.to_string(),
            access_token: access_token.to_string(),
            ..Default::default()
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: &str) -> Self {
        self.refresh_token = Some(refresh_token.to_string());
        self
    }

    pub fn with_token_service(mut self, url: &str, client_id: &str, client_secret: &str) -> Self {
        self.token_service_url = Some(url.to_string());
        self.client_id = Some(client_id.to_string());
        self.client_secret = Some(client_secret.to_string());
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = Some(api_base.to_string());
        self
    }

    /// Scheme and host every API path is appended to.
    pub fn base_url(&self) -> String {
        match self.api_base.as_deref().filter(|b| !b.is_empty()) {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.{}", self.domain_prefix, DEFAULT_API_HOST),
        }
    }

    /// Full URL of an API path such as `/api/2.0/products`.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url(), path)
        } else {
            format!("{}/{}", self.base_url(), path)
        }
    }

    /// Returns `true` when both the domain prefix and the access token are set.
    pub fn can_dispatch(&self) -> bool {
        !self.domain_prefix.is_empty() && !self.access_token.is_empty()
    }

    /// The four values a token refresh needs, or `None` if any is missing.
    pub fn refresh_credentials(&self) -> Option<RefreshCredentials<'_>> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }
        Some(RefreshCredentials {
            token_service_url: present(&self.token_service_url)?,
            client_id: present(&self.client_id)?,
            client_secret: present(&self.client_secret)?,
            refresh_token: present(&self.refresh_token)?,
        })
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("domain_prefix", &self.domain_prefix)
            .field("access_token", &mask_token(&self.access_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .field("token_service_url", &self.token_service_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "****"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Masks a token for display, keeping the last four characters.
pub fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 8 {
        return "*".repeat(count);
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Receives every token pair issued by a refresh.
///
/// The listener is awaited before the retried request is sent, so an external
/// store never lags behind the in-memory session.
#[async_trait]
pub trait TokenListener: Send + Sync {
    async fn token_updated(&self, domain_prefix: &str, tokens: &TokenSet) -> anyhow::Result<()>;
}

/// What a refresh attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens were fetched and applied.
    Refreshed,
    /// Another task replaced the stale token while this one waited.
    AlreadyRefreshed,
}

/// Shared handle to the session's [`ConnectionInfo`].
#[derive(Clone)]
pub struct Connection {
    info: Arc<RwLock<ConnectionInfo>>,
    refresh_lock: Arc<Mutex<()>>,
    listener: Option<Arc<dyn TokenListener>>,
}

impl Connection {
    pub fn new(info: ConnectionInfo) -> Self {
        Self {
            info: Arc::new(RwLock::new(info)),
            refresh_lock: Arc::new(Mutex::new(())),
            listener: None,
        }
    }

    /// Registers the listener notified after each refresh.
    pub fn with_listener(mut self, listener: Arc<dyn TokenListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// A copy of the current connection state.
    pub async fn snapshot(&self) -> ConnectionInfo {
        self.info.read().await.clone()
    }

    pub async fn access_token(&self) -> String {
        self.info.read().await.access_token.clone()
    }

    /// Refreshes the access token unless `stale_access_token` was already
    /// replaced.
    ///
    /// # Errors
    ///
    /// - [`ApiError::MissingArguments`] if the refresh credentials are incomplete
    /// - [`ApiError::RefreshFailed`] if the token endpoint rejected the refresh
    /// - [`ApiError::Persistence`] if the listener failed
    /// - any transport or unexpected error from the token endpoint
    pub async fn refresh(
        &self,
        http: &Client,
        stale_access_token: &str,
    ) -> Result<RefreshOutcome, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot().await;
        if current.access_token != stale_access_token {
            debug!(
                domain_prefix = %current.domain_prefix,
                "access token already refreshed by another call"
            );
            return Ok(RefreshOutcome::AlreadyRefreshed);
        }

        let credentials = current
            .refresh_credentials()
            .ok_or_else(|| ApiError::MissingArguments("refresh_access_token".to_string()))?;
        let tokens = refresh_access_token(http, &credentials, &current.domain_prefix).await?;
        self.apply_tokens(&tokens).await?;
        Ok(RefreshOutcome::Refreshed)
    }

    /// Writes a new token pair into the shared state, then awaits the listener.
    ///
    /// The refresh token is only replaced when the provider rotated it.
    pub async fn apply_tokens(&self, tokens: &TokenSet) -> Result<(), ApiError> {
        let domain_prefix = {
            let mut info = self.info.write().await;
            info.access_token = tokens.access_token.clone();
            if let Some(refresh_token) = &tokens.refresh_token {
                info.refresh_token = Some(refresh_token.clone());
            }
            info.domain_prefix.clone()
        };
        info!(
            domain_prefix = %domain_prefix,
            rotated_refresh_token = tokens.refresh_token.is_some(),
            "access token updated"
        );

        if let Some(listener) = &self.listener {
            listener
                .token_updated(&domain_prefix, tokens)
                .await
                .map_err(|e| ApiError::Persistence(format!("{e:#}")))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
