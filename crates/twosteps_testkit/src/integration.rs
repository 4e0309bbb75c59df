//! In-process HTTP test harness.
//!
//! Drives the full axum router without opening a socket, keeping the
//! session cookie between requests the way a browser would.

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use twosteps_server::{router, AppState, ServerConfig, SESSION_COOKIE};
use twosteps_store::{DocumentStore, InMemoryStore};

/// A decoded response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Parsed JSON body (`Null` if the body was empty or not JSON).
    pub body: Value,
    /// Raw `Set-Cookie` header, if any.
    pub set_cookie: Option<String>,
}

/// A router plus a one-cookie jar.
pub struct HttpHarness {
    app: Router,
    cookie: Option<String>,
}

impl HttpHarness {
    /// Creates a harness over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Creates a harness over `store`.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            app: router(AppState::new(ServerConfig::default(), store)),
            cookie: None,
        }
    }

    /// The session cookie currently held, as `session_token=<t>`.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Replaces the held cookie.
    pub fn set_cookie(&mut self, cookie: Option<String>) {
        self.cookie = cookie;
    }

    /// Sends a GET request.
    pub async fn get(&mut self, uri: &str) -> HttpResponse {
        self.send(Method::GET, uri, None).await
    }

    /// Sends a POST request with a JSON body.
    pub async fn post(&mut self, uri: &str, body: Value) -> HttpResponse {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    /// Sends a POST request with a raw body.
    pub async fn post_raw(&mut self, uri: &str, body: &str) -> HttpResponse {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    /// Signs in and keeps the resulting cookie.
    pub async fn sign_in(&mut self, username: &str) -> HttpResponse {
        self.post("/signin", serde_json::json!({ "username": username }))
            .await
    }

    async fn send(&mut self, method: Method, uri: &str, body: Option<String>) -> HttpResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        if let Some(header) = &set_cookie {
            self.absorb_cookie(header);
        }

        HttpResponse {
            status,
            body,
            set_cookie,
        }
    }

    /// Updates the jar from a `Set-Cookie` header.
    fn absorb_cookie(&mut self, header: &str) {
        let Some(pair) = header.split(';').next() else {
            return;
        };
        let Some((name, value)) = pair.trim().split_once('=') else {
            return;
        };
        if name != SESSION_COOKIE {
            return;
        }
        if value.is_empty() || header.contains("Max-Age=0") {
            self.cookie = None;
        } else {
            self.cookie = Some(format!("{SESSION_COOKIE}={value}"));
        }
    }
}

impl Default for HttpHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cookie_jar_follows_sign_in_and_out() {
        let mut http = HttpHarness::new();
        assert!(http.cookie().is_none());

        let resp = http.sign_in("alice").await;
        assert_eq!(resp.status, StatusCode::OK);
        assert!(http.cookie().unwrap().starts_with("session_token="));

        let resp = http.post_raw("/signout", "").await;
        assert_eq!(resp.status, StatusCode::OK);
        assert!(http.cookie().is_none());
    }
}
