//
//  vend-client
//  api/retry.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Retry Strategies
//!
//! One strategy per retryable [`ErrorKind`]. Each checks its own counter
//! against the ceiling, waits or refreshes, bumps the counter and returns
//! `Ok(())`, which tells the dispatcher to rebuild the request and send it
//! again. Reaching the ceiling yields [`ApiError::RetryExhausted`].
//!
//! | Kind | Before the next attempt |
//! |------|-------------------------|
//! | `Connection` | sleeps `backoff_step * (n + 1)` |
//! | `RateLimited` | sleeps until the `retry-after` instant in the body, else the `Retry-After` header |
//! | `AuthExpired` | refreshes the access token through the shared [`Connection`] |
//!
//! Counters are independent: a call may see three connection retries, then
//! three rate-limit retries, then three auth retries.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::common::{ApiError, ErrorKind, Failure};
use crate::auth::{Connection, RefreshOutcome};

/// Retries allowed per failure category.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Unit of the linear connection backoff.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Epoch values above this are treated as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Retry ceiling and connection backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_step: Duration) -> Self {
        Self {
            max_retries,
            backoff_step,
        }
    }

    /// Delay before connection retry number `retries_so_far + 1`.
    ///
    /// With the default step: 1s, 2s, 3s.
    pub fn connection_backoff(&self, retries_so_far: u32) -> Duration {
        self.backoff_step * (retries_so_far + 1)
    }
}

/// Per-call retry counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    pub connection: u32,
    pub rate_limit: u32,
    pub auth: u32,
    /// Last refresh rejection seen during the call.
    pub refresh_error: Option<String>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries already spent on `kind`; zero for kinds that are never retried.
    pub fn count(&self, kind: ErrorKind) -> u32 {
        match kind {
            ErrorKind::Connection => self.connection,
            ErrorKind::RateLimited => self.rate_limit,
            ErrorKind::AuthExpired => self.auth,
            ErrorKind::Client | ErrorKind::Unknown => 0,
        }
    }

    fn bump(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Connection => self.connection += 1,
            ErrorKind::RateLimited => self.rate_limit += 1,
            ErrorKind::AuthExpired => self.auth += 1,
            ErrorKind::Client | ErrorKind::Unknown => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.connection + self.rate_limit + self.auth
    }
}

/// What the strategies need from the dispatcher.
pub struct RetryContext<'a> {
    pub operation: &'a str,
    pub policy: &'a RetryPolicy,
    pub http: &'a Client,
    pub connection: &'a Connection,
}

impl RetryContext<'_> {
    fn ensure_budget(
        &self,
        state: &RetryState,
        kind: ErrorKind,
        failure: &Failure,
    ) -> Result<u32, ApiError> {
        let used = state.count(kind);
        if used >= self.policy.max_retries {
            error!(
                operation = self.operation,
                kind = %kind,
                retries = used,
                error = %failure.describe(),
                "retry.exhausted"
            );
            return Err(ApiError::RetryExhausted {
                operation: self.operation.to_string(),
                kind,
                retries: used,
                last: failure.describe(),
                refresh_error: state.refresh_error.clone(),
            });
        }
        Ok(used)
    }
}

/// Waits out a connection failure with linear backoff.
pub async fn retry_on_connection_error(
    ctx: &RetryContext<'_>,
    state: &mut RetryState,
    failure: &Failure,
) -> Result<(), ApiError> {
    let used = ctx.ensure_budget(state, ErrorKind::Connection, failure)?;
    let delay = ctx.policy.connection_backoff(used);
    warn!(
        operation = ctx.operation,
        retry = used + 1,
        max_retries = ctx.policy.max_retries,
        delay_ms = delay.as_millis() as u64,
        error = %failure.describe(),
        "retry.connection"
    );
    tokio::time::sleep(delay).await;
    state.bump(ErrorKind::Connection);
    Ok(())
}

/// Waits until the instant the server named in its 429 response.
pub async fn retry_on_rate_limit(
    ctx: &RetryContext<'_>,
    state: &mut RetryState,
    failure: &Failure,
) -> Result<(), ApiError> {
    let used = ctx.ensure_budget(state, ErrorKind::RateLimited, failure)?;
    let wait = rate_limit_wait(failure.body(), failure.retry_after(), Utc::now());
    warn!(
        operation = ctx.operation,
        retry = used + 1,
        max_retries = ctx.policy.max_retries,
        wait_ms = wait.as_millis() as u64,
        "retry.rate_limited"
    );
    tokio::time::sleep(wait).await;
    state.bump(ErrorKind::RateLimited);
    Ok(())
}

/// Refreshes the access token the failed attempt was sent with.
///
/// Fails with [`ApiError::MissingArguments`] before touching any counter when
/// the connection cannot refresh. A rejected refresh is recorded in
/// [`RetryState::refresh_error`] and the call is retried with the old token,
/// so a revoked refresh token converges on [`ApiError::RetryExhausted`].
pub async fn retry_on_auth_failure(
    ctx: &RetryContext<'_>,
    state: &mut RetryState,
    failure: &Failure,
    stale_access_token: &str,
) -> Result<(), ApiError> {
    if ctx.connection.snapshot().await.refresh_credentials().is_none() {
        warn!(
            operation = ctx.operation,
            "access token rejected and no refresh credentials configured"
        );
        return Err(ApiError::MissingArguments("refresh_access_token".to_string()));
    }

    let used = ctx.ensure_budget(state, ErrorKind::AuthExpired, failure)?;
    state.bump(ErrorKind::AuthExpired);

    match ctx.connection.refresh(ctx.http, stale_access_token).await {
        Ok(RefreshOutcome::Refreshed) => {
            debug!(operation = ctx.operation, retry = used + 1, "retry.auth refreshed");
        }
        Ok(RefreshOutcome::AlreadyRefreshed) => {
            debug!(operation = ctx.operation, retry = used + 1, "retry.auth reusing token");
        }
        Err(ApiError::RefreshFailed(reason)) => {
            warn!(
                operation = ctx.operation,
                retry = used + 1,
                reason = %reason,
                "retry.auth refresh rejected, retrying with current token"
            );
            state.refresh_error = Some(reason);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// How long to wait before retrying a 429.
///
/// Reads `retry-after` (or `retry_after`) from a JSON body. The value may be
/// an RFC 3339 or RFC 2822 timestamp, or unix time in seconds or
/// milliseconds, as a number or a string. When the body names no instant,
/// the `Retry-After` header is used instead: delta-seconds or an HTTP date.
/// Past instants and unreadable values yield zero.
pub fn rate_limit_wait(
    body: Option<&str>,
    retry_after_header: Option<&str>,
    now: DateTime<Utc>,
) -> Duration {
    let until = |at: DateTime<Utc>| (at - now).to_std().unwrap_or(Duration::ZERO);

    if let Some(at) = body.and_then(body_retry_after) {
        return until(at);
    }
    let Some(header) = retry_after_header.map(str::trim) else {
        return Duration::ZERO;
    };
    if let Ok(secs) = header.parse::<u64>() {
        return Duration::from_secs(secs);
    }
    DateTime::parse_from_rfc2822(header)
        .map(|at| until(at.with_timezone(&Utc)))
        .unwrap_or(Duration::ZERO)
}

fn body_retry_after(body: &str) -> Option<DateTime<Utc>> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    parse_instant(json.get("retry-after").or_else(|| json.get("retry_after"))?)
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_rfc2822(s))
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| s.parse::<i64>().ok().and_then(from_epoch))
        }
        _ => None,
    }
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value > MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}
