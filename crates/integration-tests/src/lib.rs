//! Integration tests for the Crown Clothing storefront.
//!
//! Tests drive the full router (session, request ID and security layers
//! included) in process with `tower::ServiceExt::oneshot`, against the
//! in-memory backend seeded with the demo catalog.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crown-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Category listing and lookup
//! - `cart` - Cart changes and persistence across requests
//! - `auth` - Sign-in, sign-up and sign-out flows

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use crown_storefront::backend::MemoryBackend;
use crown_storefront::config::StorefrontConfig;
use crown_storefront::routes;
use crown_storefront::seed::demo_catalog;
use crown_storefront::state::{AppState, BackendProvider};

/// Largest response body read by the helpers.
const MAX_BODY: usize = 1024 * 1024;

/// A response with its body decoded as JSON (`Value::Null` when empty).
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// A storefront running against a seeded in-memory backend, plus one
/// browser's cookie jar.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub backend: MemoryBackend,
    cookie: Option<String>,
}

impl TestApp {
    /// Start a storefront with the demo catalog.
    pub async fn new() -> Self {
        let backend = MemoryBackend::new();
        backend.seed_categories(demo_catalog().unwrap()).await;
        Self::with_backend(backend)
    }

    /// Start a storefront around an already prepared backend.
    pub fn with_backend(backend: MemoryBackend) -> Self {
        let config = StorefrontConfig::from_vars(&|key| match key {
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            "STOREFRONT_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap();
        let state = AppState::with_backends(config, BackendProvider::Memory(backend.clone()));

        Self {
            router: routes::router(state.clone()),
            state,
            backend,
            cookie: None,
        }
    }

    /// The same server seen from a browser without cookies.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            router: self.router.clone(),
            state: self.state.clone(),
            backend: self.backend.clone(),
            cookie: None,
        }
    }

    /// Send a request, keeping the session cookie between calls.
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), MAX_BODY).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Whether a session cookie has been issued to this browser.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }
}
