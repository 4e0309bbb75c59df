//! Router assembly and the listening server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler;
use crate::service::BoardService;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use twosteps_store::{DocumentStore, FileStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The board service (shared across all handlers).
    pub service: Arc<BoardService>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates handler state over `store`.
    pub fn new(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self::with_service(config, Arc::new(BoardService::new(store)))
    }

    /// Creates handler state around an existing service.
    pub fn with_service(config: ServerConfig, service: Arc<BoardService>) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }
}

/// Builds the full application router.
///
/// | Method | Path | Auth |
/// |---|---|---|
/// | GET | `/` | none |
/// | GET | `/health` | none |
/// | POST | `/signin` | none |
/// | POST | `/signout` | cookie optional |
/// | GET, POST | `/state` | cookie |
/// | GET | `/history` | cookie |
/// | POST | `/history/clear` | cookie |
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/signin", post(handler::sign_in))
        .route("/signout", post(handler::sign_out))
        .route(
            "/state",
            get(handler::get_state).post(handler::update_state),
        )
        .route("/history", get(handler::get_history))
        .route("/history/clear", post(handler::clear_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    // Credentials rule out a literal `*`, so "any" mirrors the caller's origin
    let origins = if config.allows_any_origin() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            ACCEPT,
            ORIGIN,
        ])
        .expose_headers([
            HeaderName::from_static("content-range"),
            HeaderName::from_static("x-content-range"),
        ])
}

/// Opens the data file and serves until Ctrl-C.
pub async fn serve(config: ServerConfig) -> ServerResult<()> {
    let store = FileStore::open(&config.data_path)?;
    // Fail fast on a corrupt file and create a fresh one if missing
    let doc = store.load()?;
    tracing::info!(
        path = %config.data_path.display(),
        users = doc.user_count(),
        sessions = doc.session_count(),
        "board loaded"
    );

    let bind_addr = config.bind_addr;
    let app = router(AppState::new(config, Arc::new(store)));

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;
    use twosteps_store::{Document, InMemoryStore, StoreError, StoreResult};

    /// Loads fine but every write fails like a full disk.
    struct ReadOnlyStore;

    impl DocumentStore for ReadOnlyStore {
        fn load(&self) -> StoreResult<Document> {
            Ok(Document::new())
        }

        fn save(&self, _doc: &Document) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other(
                "no space left on device",
            )))
        }
    }

    fn create_app() -> Router {
        router(AppState::new(
            ServerConfig::default(),
            Arc::new(InMemoryStore::new()),
        ))
    }

    fn post_json(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Returns the `name=value` pair of the response's session cookie.
    fn cookie_pair(resp: &Response) -> String {
        let header = resp.headers()[SET_COOKIE].to_str().unwrap();
        header.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn index_and_health() {
        let app = create_app();

        let resp = app.clone().oneshot(get("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "Two Steps Main");

        let resp = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Health check");
        assert_eq!(json["data"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn full_board_flow() {
        let app = create_app();

        // 1. Sign in
        let resp = app
            .clone()
            .oneshot(post_json("/signin", r#"{"username":"alice"}"#, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        let cookie = cookie_pair(&resp);
        assert_eq!(body_json(resp).await["username"], "alice");

        // 2. Initial state
        let resp = app
            .clone()
            .oneshot(get("/state", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let state = body_json(resp).await;
        assert_eq!(state["username"], "alice");
        assert_eq!(state["x"], 100);
        assert_eq!(state["y"], 50);
        assert_eq!(state["color"], "white");

        // 3. Move
        let resp = app
            .clone()
            .oneshot(post_json(
                "/state",
                r#"{"x":5,"y":7,"color":"red"}"#,
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // 4. History has both snapshots
        let resp = app
            .clone()
            .oneshot(get("/history", Some(&cookie)))
            .await
            .unwrap();
        let history = body_json(resp).await["history"].clone();
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[1]["x"], 5);
        assert_eq!(history[1]["color"], "red");

        // 5. Clear
        let resp = app
            .clone()
            .oneshot(post_json("/history/clear", "", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(get("/history", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["history"], serde_json::json!([]));

        // 6. Sign out invalidates the cookie
        let resp = app
            .clone()
            .oneshot(post_json("/signout", "", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[SET_COOKIE]
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        let resp = app.oneshot(get("/state", Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_username_rejected() {
        let app = create_app();
        for body in [r#"{"username":"   "}"#, r#"{}"#, "", r#"{"username":42}"#] {
            let resp = app
                .clone()
                .oneshot(post_json("/signin", body, None))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body:?}");
            assert!(body_json(resp).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn missing_field_rejected() {
        let app = create_app();
        let resp = app
            .clone()
            .oneshot(post_json("/signin", r#"{"username":"bob"}"#, None))
            .await
            .unwrap();
        let cookie = cookie_pair(&resp);

        let resp = app
            .clone()
            .oneshot(post_json("/state", r#"{"x":5,"color":"red"}"#, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "missing field: y");

        let resp = app
            .oneshot(get("/history", Some(&cookie)))
            .await
            .unwrap();
        let history = body_json(resp).await["history"].clone();
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_requests_rejected() {
        let app = create_app();
        let requests = [
            get("/state", None),
            post_json("/state", r#"{"x":1,"y":2,"color":"red"}"#, None),
            post_json("/state", "garbage", None),
            get("/history", None),
            post_json("/history/clear", "", None),
            get("/state", Some("session_token=not-a-real-token")),
        ];

        for request in requests {
            let uri = request.uri().clone();
            let resp = app.clone().oneshot(request).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn oversized_anonymous_update_is_unauthorized() {
        let app = create_app();
        let padding = "a".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"x":1,"y":2,"color":"{padding}"}}"#);

        let resp = app
            .oneshot(post_json("/state", &body, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn oversized_update_is_rejected_without_write() {
        let app = create_app();
        let resp = app
            .clone()
            .oneshot(post_json("/signin", r#"{"username":"alice"}"#, None))
            .await
            .unwrap();
        let cookie = cookie_pair(&resp);

        let padding = "a".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"x":1,"y":2,"color":"{padding}"}}"#);
        let resp = app
            .clone()
            .oneshot(post_json("/state", &body, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app.oneshot(get("/history", Some(&cookie))).await.unwrap();
        let history = body_json(resp).await["history"].clone();
        assert_eq!(history.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sign_out_without_cookie_is_ok() {
        let app = create_app();
        let resp = app.oneshot(post_json("/signout", "", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "Signed out");
    }

    #[tokio::test]
    async fn cors_allows_credentials() {
        let app = create_app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/state")
            .header(ORIGIN, "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(request).await.unwrap();
        let headers = resp.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:3000"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn corrupt_store_returns_generic_500() {
        let store = Arc::new(InMemoryStore::with_data(b"{oops".to_vec()));
        let app = router(AppState::new(ServerConfig::default(), store));

        let resp = app
            .oneshot(post_json("/signin", r#"{"username":"alice"}"#, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "internal server error");
    }

    #[tokio::test]
    async fn write_failure_returns_generic_500() {
        let app = router(AppState::new(ServerConfig::default(), Arc::new(ReadOnlyStore)));

        let resp = app
            .oneshot(post_json("/signin", r#"{"username":"alice"}"#, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "internal server error");
        assert!(!json.to_string().contains("no space left"));
    }
}
