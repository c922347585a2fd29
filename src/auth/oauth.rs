//
//  vend-client
//  auth/oauth.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # OAuth 2.0 Token Endpoint
//!
//! This module talks to the identity provider's token endpoint. It supports
//! the two grants a Vend integration uses:
//!
//! | Grant | Function | When |
//! |-------|----------|------|
//! | `refresh_token` | [`refresh_access_token`] | the API answered 401 |
//! | `authorization_code` | [`exchange_code`] | once, after the store owner approved the app |
//!
//! Both are form-encoded POSTs. The endpoint URL is a template that may contain
//! the `{DOMAIN_PREFIX}` placeholder, substituted with the store's prefix
//! before the call.
//!
//! ## Failure Signaling
//!
//! A 429 or 4xx answer to a refresh means the provider refused it, usually
//! because the refresh token was revoked. That outcome is returned as
//! [`ApiError::RefreshFailed`] so callers can tell it apart from a network
//! problem. Connection failures and 5xx answers propagate unchanged.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reqwest::Client;
//! use vend_client::auth::{refresh_access_token, RefreshCredentials};
//!
//! async fn refresh() -> Result<(), vend_client::api::common::ApiError> {
//!     let credentials = RefreshCredentials {
//!         token_service_url: "https://{DOMAIN_PREFIX}.vendhq.com/api/1.0/token",
//!         client_id: "client-id",
//!         client_secret: "client-secret",
//!         refresh_token: "refresh-token",
//!     };
//!     let tokens = refresh_access_token(&Client::new(), &credentials, "mystore").await?;
//!     println!("new access token expires at {:?}", tokens.expires_at);
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::api::common::{summarize_error_body, ApiError, ErrorKind, Failure};

/// Placeholder substituted with the store's domain prefix in token URLs.
pub const DOMAIN_PREFIX_PLACEHOLDER: &str = "{DOMAIN_PREFIX}";

/// The values a refresh needs, borrowed from a [`ConnectionInfo`](super::ConnectionInfo).
#[derive(Debug, Clone, Copy)]
pub struct RefreshCredentials<'a> {
    pub token_service_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub refresh_token: &'a str,
}

/// Tokens issued by the token endpoint.
///
/// `refresh_token` is `None` when the provider did not rotate it; the previous
/// refresh token stays valid in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Returned by the code exchange; identifies the store that authorized.
    pub domain_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponseRaw {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    /// Absolute expiry, unix seconds.
    #[serde(default)]
    expires: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    domain_prefix: Option<String>,
}

impl From<TokenResponseRaw> for TokenSet {
    fn from(raw: TokenResponseRaw) -> Self {
        let expires_at = raw
            .expires
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| raw.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));

        Self {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token.filter(|t| !t.is_empty()),
            token_type: raw.token_type,
            expires_at,
            domain_prefix: raw.domain_prefix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    RefreshToken,
    AuthorizationCode,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Self::RefreshToken => "refresh_token",
            Self::AuthorizationCode => "authorization_code",
        }
    }
}

/// Substitutes the domain prefix into a token URL template.
///
/// A URL without the placeholder is returned unchanged.
pub fn token_endpoint(template: &str, domain_prefix: &str) -> String {
    template.replace(DOMAIN_PREFIX_PLACEHOLDER, domain_prefix)
}

/// Exchanges a refresh token for a new access token.
///
/// # Parameters
///
/// - `http`: Client used for the call.
/// - `credentials`: Token endpoint, client id/secret and refresh token.
/// - `domain_prefix`: Substituted into the endpoint template.
///
/// # Returns
///
/// Returns the issued [`TokenSet`].
///
/// Returns `Err` with:
/// - [`ApiError::MissingArguments`] if any credential is empty; nothing is sent
/// - [`ApiError::RefreshFailed`] if the endpoint answered 429 or 4xx
/// - [`ApiError::Transport`] or [`ApiError::Unexpected`] for network and server failures
/// - [`ApiError::Parse`] if the success body is not a token response
pub async fn refresh_access_token(
    http: &Client,
    credentials: &RefreshCredentials<'_>,
    domain_prefix: &str,
) -> Result<TokenSet, ApiError> {
    let RefreshCredentials {
        token_service_url,
        client_id,
        client_secret,
        refresh_token,
    } = *credentials;
    if [token_service_url, client_id, client_secret, refresh_token]
        .iter()
        .any(|v| v.is_empty())
    {
        return Err(ApiError::MissingArguments("refresh_access_token".to_string()));
    }

    let url = token_endpoint(token_service_url, domain_prefix);
    let params = [
        ("grant_type", Grant::RefreshToken.as_str()),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("refresh_token", refresh_token),
    ];
    request_tokens(http, &url, &params, Grant::RefreshToken).await
}

/// Exchanges an authorization code for the store's first token pair.
///
/// The returned [`TokenSet::domain_prefix`] names the store that approved the
/// app.
pub async fn exchange_code(
    http: &Client,
    token_service_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
    domain_prefix: &str,
) -> Result<TokenSet, ApiError> {
    if [token_service_url, client_id, client_secret, code, redirect_uri]
        .iter()
        .any(|v| v.is_empty())
    {
        return Err(ApiError::MissingArguments("exchange_code".to_string()));
    }

    let url = token_endpoint(token_service_url, domain_prefix);
    let params = [
        ("grant_type", Grant::AuthorizationCode.as_str()),
        ("client_id", client_id),
        ("client_secret", client_secret),
        ("code", code),
        ("redirect_uri", redirect_uri),
    ];
    request_tokens(http, &url, &params, Grant::AuthorizationCode).await
}

async fn request_tokens(
    http: &Client,
    url: &str,
    params: &[(&str, &str)],
    grant: Grant,
) -> Result<TokenSet, ApiError> {
    debug!(url, grant = grant.as_str(), "requesting tokens");

    let response = match http.post(url).form(params).send().await {
        Ok(response) => response,
        Err(e) => {
            error!(url, grant = grant.as_str(), error = %e, "token endpoint unreachable");
            return Err(ApiError::Transport(e));
        }
    };

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let failure = Failure::Status {
            status,
            body,
            retry_after: None,
        };
        return match (grant, failure.kind()) {
            (Grant::RefreshToken, ErrorKind::RateLimited | ErrorKind::AuthExpired | ErrorKind::Client) => {
                warn!(
                    status = status.as_u16(),
                    reason = %failure.body().map(summarize_error_body).unwrap_or_default(),
                    "token refresh rejected"
                );
                Err(ApiError::RefreshFailed(failure.describe()))
            }
            _ => {
                error!(
                    status = status.as_u16(),
                    grant = grant.as_str(),
                    "token endpoint failed"
                );
                Err(failure.into_error())
            }
        };
    }

    let raw: TokenResponseRaw = serde_json::from_str(&body)?;
    info!(
        grant = grant.as_str(),
        rotated_refresh_token = raw.refresh_token.is_some(),
        "token endpoint issued a new access token"
    );
    Ok(raw.into())
}
