//
//  vend-client
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common API Types: errors, failure classification and pagination
//!
//! This module provides the error surface shared by every call the client
//! makes, together with the classifier that decides how a failed HTTP outcome
//! is handled.
//!
//! # Overview
//!
//! - [`ApiError`] - Closed error type returned by every API operation
//! - [`ErrorKind`] - Classification of a failed HTTP outcome
//! - [`Failure`] - A failed outcome as observed on the wire
//! - [`classify`] - Maps a failed outcome to exactly one [`ErrorKind`]
//! - Pagination engine (re-exported from the [`pagination`] submodule)
//!
//! # Classification Order
//!
//! | Check | Kind | Handling |
//! |-------|------|----------|
//! | Transport failure before any response | `Connection` | retried, linear backoff |
//! | HTTP 429 | `RateLimited` | retried, server-dictated wait |
//! | HTTP 401 | `AuthExpired` | retried after a token refresh |
//! | Other HTTP 4xx | `Client` | terminal, `"<status> <body>"` |
//! | Anything else | `Unknown` | terminal, surfaced unmodified |
//!
//! # Example
//!
//! ```rust
//! use reqwest::StatusCode;
//! use vend_client::api::common::{classify, ErrorKind};
//!
//! assert_eq!(classify(Some(StatusCode::TOO_MANY_REQUESTS), false), ErrorKind::RateLimited);
//! assert_eq!(classify(Some(StatusCode::NOT_FOUND), false), ErrorKind::Client);
//! assert_eq!(classify(None, true), ErrorKind::Connection);
//! ```

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

pub mod pagination;

pub use pagination::*;

/// Unified error type for all Vend API operations.
///
/// The `Display` output of the precondition and client-error variants matches
/// the plain messages callers have historically matched on:
/// `"missing required arguments for <operation>()"` and
/// `"<status> <response body>"`.
///
/// # Variants
///
/// | Variant | Retried | Raised when |
/// |---------|---------|-------------|
/// | `MissingArguments` | never | a required argument or credential is absent |
/// | `Client` | never | HTTP 4xx other than 401/429 |
/// | `Parse` | never | a success body is not valid JSON |
/// | `Unexpected` | never | HTTP 5xx or other unclassified status |
/// | `Transport` | never | the request could not be built or its body could not be read |
/// | `RetryExhausted` | - | a retry ceiling was reached |
/// | `RefreshFailed` | - | the token endpoint rejected a refresh |
/// | `Persistence` | never | the token listener failed to persist new tokens |
/// | `InvalidRequest` | never | a request spec could not be turned into a request |
#[derive(Error, Debug)]
pub enum ApiError {
    /// A local precondition failed; nothing was sent.
    #[error("missing required arguments for {0}()")]
    MissingArguments(String),

    /// A terminal 4xx response.
    #[error("{status} {body}")]
    Client {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The response body could not be parsed as JSON.
    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    /// A server error or otherwise unclassified HTTP status.
    #[error("unexpected response {status}: {body}")]
    Unexpected {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The request could not be built or its response body could not be read.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// A retry ceiling was reached.
    ///
    /// `refresh_error` holds the last token refresh failure, if any, so that a
    /// permanently revoked refresh token can be told apart from a flaky
    /// network.
    #[error("retry attempts exhausted for {operation}() after {retries} {kind} retries: {last}")]
    RetryExhausted {
        /// Operation that gave up
        operation: String,
        /// Category whose ceiling was reached
        kind: ErrorKind,
        /// Number of retries performed in that category
        retries: u32,
        /// Description of the last failure
        last: String,
        /// Last refresh failure observed during the call
        refresh_error: Option<String>,
    },

    /// The token endpoint refused to refresh the access token.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// Refreshed tokens could not be persisted by the token listener.
    #[error("failed to persist refreshed tokens: {0}")]
    Persistence(String),

    /// A request spec was malformed (bad URL, header or method).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The classification this error corresponds to, when it came from an
    /// HTTP outcome.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Client { .. } => Some(ErrorKind::Client),
            Self::Unexpected { .. } => Some(ErrorKind::Unknown),
            Self::RetryExhausted { kind, .. } => Some(*kind),
            Self::Transport(e) if e.is_connect() || e.is_timeout() => Some(ErrorKind::Connection),
            Self::Transport(_) => Some(ErrorKind::Unknown),
            _ => None,
        }
    }
}

/// Classification of a failed HTTP outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport failure before any response was received.
    Connection,
    /// HTTP 429 Too Many Requests.
    RateLimited,
    /// HTTP 401 Unauthorized.
    AuthExpired,
    /// Any other HTTP 4xx.
    Client,
    /// 5xx or unclassified.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::RateLimited => write!(f, "rate-limit"),
            Self::AuthExpired => write!(f, "auth"),
            Self::Client => write!(f, "client"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Maps a failed outcome to exactly one [`ErrorKind`].
///
/// `connection_level` is true when the transport failed before a response
/// arrived; in that case no status exists and the outcome is a
/// [`ErrorKind::Connection`] failure regardless of anything else.
pub fn classify(status: Option<StatusCode>, connection_level: bool) -> ErrorKind {
    if connection_level {
        return ErrorKind::Connection;
    }
    match status {
        Some(StatusCode::TOO_MANY_REQUESTS) => ErrorKind::RateLimited,
        Some(StatusCode::UNAUTHORIZED) => ErrorKind::AuthExpired,
        Some(s) if s.is_client_error() => ErrorKind::Client,
        _ => ErrorKind::Unknown,
    }
}

/// A failed HTTP outcome, before it has been routed to a retry strategy.
#[derive(Debug)]
pub enum Failure {
    /// The request failed before any response headers arrived: refused,
    /// reset, closed mid-handshake or timed out.
    Transport(reqwest::Error),
    /// Headers arrived but the body could not be read.
    Body(reqwest::Error),
    /// The server answered with a non-success status.
    Status {
        /// HTTP status code
        status: StatusCode,
        /// Raw response body
        body: String,
        /// Value of the `Retry-After` header, if any
        retry_after: Option<String>,
    },
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // A request reqwest refused to build never reached the network.
            Self::Transport(e) => classify(None, !e.is_builder()),
            Self::Body(e) => classify(e.status(), e.is_connect() || e.is_timeout()),
            Self::Status { status, .. } => classify(Some(*status), false),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(e) | Self::Body(e) => e.status(),
            Self::Status { status, .. } => Some(*status),
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::Transport(_) | Self::Body(_) => None,
        }
    }

    /// The `Retry-After` header of a status failure.
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::Status { retry_after, .. } => retry_after.as_deref(),
            Self::Transport(_) | Self::Body(_) => None,
        }
    }

    /// Short description used in logs and in [`ApiError::RetryExhausted`].
    pub fn describe(&self) -> String {
        match self {
            Self::Transport(e) | Self::Body(e) => e.to_string(),
            Self::Status { status, body, .. } => format!("{} {}", status.as_u16(), body),
        }
    }

    /// Converts a failure that will not be retried into the error the caller
    /// observes.
    pub fn into_error(self) -> ApiError {
        match self {
            Self::Transport(e) | Self::Body(e) => ApiError::Transport(e),
            Self::Status { status, body, .. } if status.is_client_error() => ApiError::Client {
                status: status.as_u16(),
                body,
            },
            Self::Status { status, body, .. } => ApiError::Unexpected {
                status: status.as_u16(),
                body,
            },
        }
    }
}

/// Extracts a readable message from a Vend error body for logging.
///
/// Vend answers errors with `{"error": "...", "details": "..."}` on the legacy
/// API and `{"errors": {"global": ["..."]}}` or `{"error": {"message": "..."}}`
/// on some 2.0 endpoints. Falls back to the raw body, truncated.
pub fn summarize_error_body(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("error").and_then(|e| e.as_str()) {
            return match json.get("details").and_then(|d| d.as_str()) {
                Some(details) => format!("{}: {}", message, details),
                None => message.to_string(),
            };
        }

        if let Some(message) = json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }

        if let Some(message) = json
            .get("errors")
            .and_then(|e| e.get("global"))
            .and_then(|g| g.as_array())
            .and_then(|arr| arr.first())
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }

    const MAX: usize = 200;
    if body.chars().count() > MAX {
        let truncated: String = body.chars().take(MAX).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connection_first() {
        assert_eq!(classify(None, true), ErrorKind::Connection);
        assert_eq!(
            classify(Some(StatusCode::UNAUTHORIZED), true),
            ErrorKind::Connection
        );
    }

    #[test]
    fn test_classify_statuses() {
        assert_eq!(
            classify(Some(StatusCode::TOO_MANY_REQUESTS), false),
            ErrorKind::RateLimited
        );
        assert_eq!(
            classify(Some(StatusCode::UNAUTHORIZED), false),
            ErrorKind::AuthExpired
        );
        assert_eq!(classify(Some(StatusCode::BAD_REQUEST), false), ErrorKind::Client);
        assert_eq!(classify(Some(StatusCode::FORBIDDEN), false), ErrorKind::Client);
        assert_eq!(classify(Some(StatusCode::NOT_FOUND), false), ErrorKind::Client);
        assert_eq!(
            classify(Some(StatusCode::INTERNAL_SERVER_ERROR), false),
            ErrorKind::Unknown
        );
        assert_eq!(
            classify(Some(StatusCode::SERVICE_UNAVAILABLE), false),
            ErrorKind::Unknown
        );
        assert_eq!(classify(None, false), ErrorKind::Unknown);
    }

    #[test]
    fn test_client_failure_message() {
        let failure = Failure::Status {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"bad"}"#.to_string(),
            retry_after: None,
        };
        assert_eq!(failure.kind(), ErrorKind::Client);
        let err = failure.into_error();
        assert_eq!(err.to_string(), r#"400 {"error":"bad"}"#);
        assert_eq!(err.kind(), Some(ErrorKind::Client));
    }

    #[test]
    fn test_server_failure_is_unexpected() {
        let failure = Failure::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream".to_string(),
            retry_after: None,
        };
        assert!(matches!(
            failure.into_error(),
            ApiError::Unexpected { status: 502, .. }
        ));
    }

    #[test]
    fn test_status_failure_carries_retry_after() {
        let failure = Failure::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
            retry_after: Some("30".to_string()),
        };
        assert_eq!(failure.kind(), ErrorKind::RateLimited);
        assert_eq!(failure.retry_after(), Some("30"));
    }

    #[test]
    fn test_unbuildable_request_is_not_a_connection_failure() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(err.is_builder());
        let failure = Failure::Transport(err);
        assert_eq!(failure.kind(), ErrorKind::Unknown);
        assert_eq!(failure.retry_after(), None);
    }

    #[test]
    fn test_summarize_legacy_error() {
        let body = r#"{"error":"Invalid product","details":"SKU already exists"}"#;
        assert_eq!(summarize_error_body(body), "Invalid product: SKU already exists");
    }

    #[test]
    fn test_summarize_nested_error() {
        let body = r#"{"error":{"message":"Not allowed"}}"#;
        assert_eq!(summarize_error_body(body), "Not allowed");
    }

    #[test]
    fn test_summarize_falls_back_to_body() {
        assert_eq!(summarize_error_body("Bad Gateway"), "Bad Gateway");
        let long = "x".repeat(300);
        assert_eq!(summarize_error_body(&long).len(), 203);
    }
}
