//
//  vend-client
//  api/request.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Request descriptors.
//!
//! A [`RequestSpec`] is plain data: method, URL, headers, query and an
//! optional JSON body. Collaborators build a fresh spec for every attempt from
//! the current [`ConnectionInfo`], so that a refreshed bearer token always
//! ends up in the request that is actually sent.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use super::common::ApiError;
use crate::auth::ConnectionInfo;

/// Everything needed to perform one HTTP call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            json: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Adds the bearer token of `connection` and `Accept: application/json`.
    pub fn authorized(mut self, connection: &ConnectionInfo) -> Result<Self, ApiError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", connection.access_token))
            .map_err(|_| ApiError::InvalidRequest("access token is not a valid header value".into()))?;
        self.headers.insert(AUTHORIZATION, bearer);
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ApiError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidRequest(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidRequest(format!("header value for '{}': {}", name.as_str(), e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn with_json(mut self, body: Value) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.json = Some(body);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection() -> ConnectionInfo {
        ConnectionInfo::new("mystore", "token-1")
    }

    #[test]
    fn test_authorized_sets_bearer_and_accept() {
        let spec = RequestSpec::get("https://mystore.vendhq.com/api/products")
            .authorized(&connection())
            .unwrap();
        assert_eq!(spec.headers[AUTHORIZATION], "Bearer token-1");
        assert_eq!(spec.headers[ACCEPT], "application/json");
        assert!(spec.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_with_json_sets_content_type() {
        let spec = RequestSpec::post("https://x").with_json(json!({"name": "Coffee"}));
        assert_eq!(spec.headers[CONTENT_TYPE], "application/json");
        assert_eq!(spec.json, Some(json!({"name": "Coffee"})));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let err = RequestSpec::get("https://x").header("bad header", "v").unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_query_pairs_accumulate() {
        let spec = RequestSpec::get("https://x")
            .with_query([("page", "1")])
            .with_query(vec![("page_size".to_string(), "50".to_string())]);
        assert_eq!(spec.query.len(), 2);
    }
}
