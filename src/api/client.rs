//
//  vend-client
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Request Dispatcher
//!
//! [`VendClient`] sends requests on behalf of the resource collaborators and
//! recovers from the three retryable failure modes of the API.
//!
//! ## Features
//!
//! - Argument and connection preconditions checked before anything is sent
//! - Request rebuilt from the caller's builder closure on every attempt
//! - `User-Agent` stamped on every request
//! - Failures classified and routed to exactly one retry strategy
//! - Success bodies parsed as JSON; parse errors surface as-is
//!
//! ## Attempt Loop
//!
//! ```text
//! snapshot connection ─▶ build(args, info) ─▶ send
//!        ▲                                     │
//!        │          Connection / 429 / 401     │ 2xx ─▶ parse ─▶ Ok
//!        └──────── retry strategy ◀────────────┤
//!                                              │ 4xx ─▶ Err(Client)
//!                                              └ 5xx ─▶ Err(Unexpected)
//! ```

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use super::args::CallArgs;
use super::common::{summarize_error_body, ApiError, ErrorKind, Failure};
use super::request::RequestSpec;
use super::retry::{
    retry_on_auth_failure, retry_on_connection_error, retry_on_rate_limit, RetryContext,
    RetryPolicy, RetryState,
};
use crate::auth::{Connection, ConnectionInfo};

/// Identifier appended to the `User-Agent` of every request.
pub fn user_agent_token() -> String {
    format!("vend-client/{}", crate::VERSION)
}

/// HTTP client for one store session.
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// [`Connection`], so a token refreshed through one clone is seen by all.
///
/// # Example
///
/// ```rust,no_run
/// use vend_client::api::{CallArgs, RequestSpec, VendClient};
/// use vend_client::auth::{Connection, ConnectionInfo};
///
/// # async fn example() -> Result<(), vend_client::api::ApiError> {
/// let connection = Connection::new(ConnectionInfo::new("mystore", "access-token"));
/// let client = VendClient::new(connection)?;
///
/// let outlets = client
///     .dispatch("listOutlets", &CallArgs::new(), |_, info| {
///         RequestSpec::get(info.api_url("/api/2.0/outlets")).authorized(info)
///     })
///     .await?;
/// println!("{}", outlets);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VendClient {
    http: Client,
    connection: Connection,
    policy: RetryPolicy,
}

impl VendClient {
    /// Creates a client with a fresh HTTP client and the default retry policy.
    pub fn new(connection: Connection) -> Result<Self, ApiError> {
        let http = Client::builder().build()?;
        Ok(Self::with_http(http, connection))
    }

    /// Creates a client around an existing HTTP client.
    pub fn with_http(http: Client, connection: Connection) -> Self {
        Self {
            http,
            connection,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs one logical call, retrying as needed.
    ///
    /// # Parameters
    ///
    /// * `operation` - Name used in errors and logs, e.g. `"fetchProduct"`
    /// * `args` - Argument set; required arguments must have values
    /// * `build` - Builds the request from the arguments and the *current*
    ///   connection state; called again before every retry
    ///
    /// # Returns
    ///
    /// The parsed JSON body, or `Value::Null` for an empty body.
    ///
    /// # Errors
    ///
    /// | Error | When |
    /// |-------|------|
    /// | `MissingArguments` | a required argument, the domain prefix, the access token or a refresh credential is missing |
    /// | `Client` | a 4xx other than 401 and 429 |
    /// | `Unexpected` | a 5xx or other unclassified status |
    /// | `RetryExhausted` | a retry ceiling was reached |
    /// | `Parse` | a 2xx body is not JSON |
    pub async fn dispatch<B>(
        &self,
        operation: &str,
        args: &CallArgs,
        build: B,
    ) -> Result<Value, ApiError>
    where
        B: Fn(&CallArgs, &ConnectionInfo) -> Result<RequestSpec, ApiError>,
    {
        args.ensure_valid(operation)?;

        let ctx = RetryContext {
            operation,
            policy: &self.policy,
            http: &self.http,
            connection: &self.connection,
        };
        let mut state = RetryState::new();

        loop {
            let info = self.connection.snapshot().await;
            if !info.can_dispatch() {
                debug!(operation, "connection has no domain prefix or access token");
                return Err(ApiError::MissingArguments(operation.to_string()));
            }

            let spec = build(args, &info)?;
            debug!(
                operation,
                method = %spec.method,
                url = %spec.url,
                attempt = state.total() + 1,
                "dispatching request"
            );

            let failure = match self.send(spec).await? {
                Ok(body) => return parse_body(&body),
                Err(failure) => failure,
            };

            match failure.kind() {
                ErrorKind::Connection => {
                    retry_on_connection_error(&ctx, &mut state, &failure).await?
                }
                ErrorKind::RateLimited => retry_on_rate_limit(&ctx, &mut state, &failure).await?,
                ErrorKind::AuthExpired => {
                    retry_on_auth_failure(&ctx, &mut state, &failure, &info.access_token).await?
                }
                kind @ (ErrorKind::Client | ErrorKind::Unknown) => {
                    error!(
                        operation,
                        kind = %kind,
                        status = failure.status().map(|s| s.as_u16()),
                        reason = %failure.body().map(summarize_error_body).unwrap_or_else(|| failure.describe()),
                        "request failed"
                    );
                    return Err(failure.into_error());
                }
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), deserializing the body into `T`.
    pub async fn dispatch_as<T, B>(
        &self,
        operation: &str,
        args: &CallArgs,
        build: B,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Fn(&CallArgs, &ConnectionInfo) -> Result<RequestSpec, ApiError>,
    {
        let value = self.dispatch(operation, args, build).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `GET path`, sending the valued arguments as the query string.
    pub async fn get(&self, operation: &str, path: &str, args: &CallArgs) -> Result<Value, ApiError> {
        self.dispatch(operation, args, |args, info| {
            Ok(RequestSpec::get(info.api_url(path))
                .authorized(info)?
                .with_query(args.query_pairs()))
        })
        .await
    }

    /// `POST path` with a JSON body.
    pub async fn post(
        &self,
        operation: &str,
        path: &str,
        args: &CallArgs,
        body: &Value,
    ) -> Result<Value, ApiError> {
        self.dispatch(operation, args, |_, info| {
            Ok(RequestSpec::post(info.api_url(path))
                .authorized(info)?
                .with_json(body.clone()))
        })
        .await
    }

    /// `PUT path` with a JSON body.
    pub async fn put(
        &self,
        operation: &str,
        path: &str,
        args: &CallArgs,
        body: &Value,
    ) -> Result<Value, ApiError> {
        self.dispatch(operation, args, |_, info| {
            Ok(RequestSpec::put(info.api_url(path))
                .authorized(info)?
                .with_json(body.clone()))
        })
        .await
    }

    pub async fn delete(&self, operation: &str, path: &str, args: &CallArgs) -> Result<Value, ApiError> {
        self.dispatch(operation, args, |_, info| {
            RequestSpec::delete(info.api_url(path)).authorized(info)
        })
        .await
    }

    /// Sends one attempt. The outer error is for requests that could not be
    /// built; the inner one for failures the retry strategies handle.
    async fn send(&self, spec: RequestSpec) -> Result<Result<String, Failure>, ApiError> {
        let RequestSpec {
            method,
            url,
            mut headers,
            query,
            json,
        } = spec;

        let url = url::Url::parse(&url)
            .map_err(|e| ApiError::InvalidRequest(format!("url '{}': {}", url, e)))?;
        stamp_user_agent(&mut headers);

        let mut request = self.http.request(method, url).headers(headers);
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = &json {
            request = request.json(body);
        }

        Ok(perform(request.send()).await)
    }
}

async fn perform<F>(send: F) -> Result<String, Failure>
where
    F: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let response = send.await.map_err(Failure::Transport)?;
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response.text().await.map_err(Failure::Body)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(Failure::Status {
            status,
            body,
            retry_after,
        })
    }
}

/// Appends the client identifier to an existing `User-Agent`, or sets it.
fn stamp_user_agent(headers: &mut HeaderMap) {
    let token = user_agent_token();
    let value = match headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        Some(existing) if existing.contains(&token) => return,
        Some(existing) if !existing.is_empty() => format!("{} {}", existing, token),
        _ => token,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(USER_AGENT, value);
    }
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(body)?)
}
