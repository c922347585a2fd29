//
//  vend-client
//  tests/dispatch.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockito::Matcher;
use serde_json::json;

use vend_client::api::{ApiError, CallArgs, CallArgument, ErrorKind, RequestSpec, RetryPolicy, VendClient};
use vend_client::auth::{Connection, ConnectionInfo, TokenListener, TokenSet};

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

fn refreshable(base: &str) -> ConnectionInfo {
    ConnectionInfo::new("mystore", "old")
        .with_api_base(base)
        .with_refresh_token("refresh-1")
        .with_token_service(&format!("{}/token", base), "client", "secret")
}

fn client_for(info: ConnectionInfo) -> VendClient {
    VendClient::new(Connection::new(info))
        .unwrap()
        .with_retry_policy(fast_policy())
}

#[derive(Default)]
struct Recorder {
    updates: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl TokenListener for Recorder {
    async fn token_updated(&self, domain_prefix: &str, tokens: &TokenSet) -> anyhow::Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((domain_prefix.to_string(), tokens.access_token.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_call_retried() {
    let mut server = mockito::Server::new_async().await;

    let expired = server
        .mock("GET", "/api/products")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .with_body(r#"{"error":"invalid_token"}"#)
        .expect(1)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
            Matcher::UrlEncoded("client_id".into(), "client".into()),
            Matcher::UrlEncoded("client_secret".into(), "secret".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"new","refresh_token":"refresh-2","token_type":"Bearer","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/api/products")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(r#"{"products":[{"id":"abc"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let connection = Connection::new(refreshable(&server.url())).with_listener(recorder.clone());
    let client = VendClient::new(connection)
        .unwrap()
        .with_retry_policy(fast_policy());

    let body = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap();

    assert_eq!(body, json!({"products": [{"id": "abc"}]}));
    expired.assert_async().await;
    token.assert_async().await;
    ok.assert_async().await;

    let info = client.connection().snapshot().await;
    assert_eq!(info.access_token, "new");
    assert_eq!(info.refresh_token.as_deref(), Some("refresh-2"));
    assert_eq!(
        *recorder.updates.lock().unwrap(),
        vec![("mystore".to_string(), "new".to_string())]
    );
}

#[tokio::test]
async fn test_expired_token_without_refresh_token_fails_fast() {
    let mut server = mockito::Server::new_async().await;

    let expired = server
        .mock("GET", "/api/products")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let token = server.mock("POST", "/token").expect(0).create_async().await;

    let mut info = refreshable(&server.url());
    info.refresh_token = None;
    let client = client_for(info);

    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, ApiError::MissingArguments(op) if op == "refresh_access_token"),
        "got {err:?}"
    );
    expired.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_rejected_refresh_exhausts_auth_retries() {
    let mut server = mockito::Server::new_async().await;

    let expired = server
        .mock("GET", "/api/products")
        .with_status(401)
        .expect(4)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .expect(3)
        .create_async()
        .await;

    let client = client_for(refreshable(&server.url()));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    match err {
        ApiError::RetryExhausted {
            kind,
            retries,
            refresh_error,
            ..
        } => {
            assert_eq!(kind, ErrorKind::AuthExpired);
            assert_eq!(retries, 3);
            assert!(refresh_error.unwrap().contains("invalid_grant"));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    expired.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_call_is_retried() {
    let mut server = mockito::Server::new_async().await;

    let limited = server
        .mock("GET", "/api/2.0/outlets")
        .with_status(429)
        .with_body(r#"{"retry-after":"2020-01-01T00:00:00Z"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/api/2.0/outlets")
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let builds = AtomicUsize::new(0);

    let body = client
        .dispatch("listOutlets", &CallArgs::new(), |_, info| {
            builds.fetch_add(1, Ordering::SeqCst);
            RequestSpec::get(info.api_url("/api/2.0/outlets")).authorized(info)
        })
        .await
        .unwrap();

    assert_eq!(body, json!({"data": []}));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    limited.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_persistent_rate_limit_exhausts_retries() {
    let mut server = mockito::Server::new_async().await;

    let limited = server
        .mock("GET", "/api/products")
        .with_status(429)
        .with_body("{}")
        .expect(4)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            ApiError::RetryExhausted { kind: ErrorKind::RateLimited, retries: 3, .. }
        ),
        "got {err:?}"
    );
    limited.assert_async().await;
}

#[tokio::test]
async fn test_connection_failures_exhaust_retries() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = format!("http://127.0.0.1:{}", port);

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&base));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            ApiError::RetryExhausted { kind: ErrorKind::Connection, retries: 3, .. }
        ),
        "got {err:?}"
    );
}

/// Accepts connections and closes them before a response is written.
async fn dropping_listener() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });
    (base, accepted)
}

#[tokio::test]
async fn test_dropped_connections_are_retried_as_connection_failures() {
    let (base, accepted) = dropping_listener().await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&base));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            ApiError::RetryExhausted { kind: ErrorKind::Connection, retries: 3, .. }
        ),
        "got {err:?}"
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_backs_off_linearly() {
    let (base, accepted) = dropping_listener().await;

    let client = VendClient::new(Connection::new(
        ConnectionInfo::new("mystore", "tok").with_api_base(&base),
    ))
    .unwrap()
    .with_retry_policy(RetryPolicy::default());

    let started = tokio::time::Instant::now();
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        matches!(
            err,
            ApiError::RetryExhausted { kind: ErrorKind::Connection, retries: 3, .. }
        ),
        "got {err:?}"
    );
    // 1s + 2s + 3s between the four attempts
    assert!(elapsed >= Duration::from_secs(6), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(7), "waited {elapsed:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_put_and_delete_send_authorized_requests() {
    let mut server = mockito::Server::new_async().await;

    let updated = server
        .mock("PUT", "/api/2.0/products/abc")
        .match_header("authorization", "Bearer tok")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"name": "Mocha"})))
        .with_status(200)
        .with_body(r#"{"data":{"id":"abc","name":"Mocha"}}"#)
        .expect(1)
        .create_async()
        .await;
    let removed = server
        .mock("DELETE", "/api/2.0/products/abc")
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let response = client
        .put(
            "updateProduct",
            "/api/2.0/products/abc",
            &CallArgs::new(),
            &json!({"name": "Mocha"}),
        )
        .await
        .unwrap();
    assert_eq!(response["data"]["name"], "Mocha");

    let response = client
        .delete("deleteProduct", "/api/2.0/products/abc", &CallArgs::new())
        .await
        .unwrap();
    assert_eq!(response, json!({}));

    updated.assert_async().await;
    removed.assert_async().await;
}

#[tokio::test]
async fn test_put_honours_retry_after_header() {
    let mut server = mockito::Server::new_async().await;

    let limited = server
        .mock("PUT", "/api/outlets/o1")
        .with_status(429)
        .with_header("retry-after", "0")
        .with_body(r#"{"error":"slow down"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("PUT", "/api/outlets/o1")
        .with_status(200)
        .with_body(r#"{"id":"o1"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let response = client
        .put("updateOutlet", "/api/outlets/o1", &CallArgs::new(), &json!({"name": "CBD"}))
        .await
        .unwrap();

    assert_eq!(response["id"], "o1");
    limited.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;

    let missing = server
        .mock("GET", "/api/2.0/products/nope")
        .with_status(404)
        .with_body(r#"{"error":"Not found"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let err = client
        .get("fetchProduct", "/api/2.0/products/nope", &CallArgs::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), r#"404 {"error":"Not found"}"#);
    assert!(matches!(err, ApiError::Client { status: 404, .. }));
    missing.assert_async().await;
}

#[tokio::test]
async fn test_server_error_surfaces_as_unexpected() {
    let mut server = mockito::Server::new_async().await;

    let broken = server
        .mock("GET", "/api/products")
        .with_status(500)
        .with_body("oops")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unexpected { status: 500, .. }), "got {err:?}");
    broken.assert_async().await;
}

#[tokio::test]
async fn test_invalid_json_is_a_parse_error() {
    let mut server = mockito::Server::new_async().await;

    let _html = server
        .mock("GET", "/api/products")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Parse(_)), "got {err:?}");
}

#[tokio::test]
async fn test_missing_required_argument_sends_nothing() {
    let mut server = mockito::Server::new_async().await;

    let never = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let args = CallArgs::new().with(CallArgument::required("productId"));
    let err = client
        .get("fetchProduct", "/api/2.0/products", &args)
        .await
        .unwrap_err();

    assert!(matches!(&err, ApiError::MissingArguments(op) if op == "fetchProduct"));
    assert_eq!(err.to_string(), "missing required arguments for fetchProduct()");
    never.assert_async().await;
}

#[tokio::test]
async fn test_missing_access_token_sends_nothing() {
    let mut server = mockito::Server::new_async().await;

    let never = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "").with_api_base(&server.url()));
    let err = client
        .get("listProducts", "/api/products", &CallArgs::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MissingArguments(_)));
    never.assert_async().await;
}

#[tokio::test]
async fn test_requests_carry_user_agent_and_query() {
    let mut server = mockito::Server::new_async().await;

    let listed = server
        .mock("GET", "/api/2.0/products")
        .match_header("user-agent", Matcher::Regex("vend-client/".into()))
        .match_header("authorization", "Bearer tok")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page_size".into(), "50".into()),
            Matcher::UrlEncoded("after".into(), "7".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let client = client_for(ConnectionInfo::new("mystore", "tok").with_api_base(&server.url()));
    let args = CallArgs::new()
        .with(CallArgument::optional("pageSize").wire_key("page_size").value(json!(50)))
        .with(CallArgument::optional("after").value(json!(7)))
        .with(CallArgument::optional("deleted"));

    client
        .get("listProducts", "/api/2.0/products", &args)
        .await
        .unwrap();
    listed.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_expiries_share_one_refresh() {
    let mut server = mockito::Server::new_async().await;

    let _expired = server
        .mock("GET", "/api/products")
        .match_header("authorization", "Bearer old")
        .with_status(401)
        .expect_at_least(1)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"new"}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/api/products")
        .match_header("authorization", "Bearer new")
        .with_status(200)
        .with_body(r#"{"products":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let client = client_for(refreshable(&server.url()));
    let other = client.clone();
    let args = CallArgs::new();

    let (first, second) = tokio::join!(
        client.get("listProducts", "/api/products", &args),
        other.get("listProducts", "/api/products", &args),
    );

    assert!(first.is_ok(), "got {first:?}");
    assert!(second.is_ok(), "got {second:?}");
    token.assert_async().await;
    ok.assert_async().await;

    let info = client.connection().snapshot().await;
    assert_eq!(info.access_token, "new");
    assert_eq!(info.refresh_token.as_deref(), Some("refresh-1"));
}
