//! Request handlers for the board endpoints.
//!
//! Handlers stay thin: decode the request, resolve the session, hand off to
//! [`BoardService`](crate::BoardService) on the blocking pool, and wrap the
//! result as JSON.

use crate::auth::{clear_session_cookie, session_cookie, token_from_headers};
use crate::error::{ServerError, ServerResult};
use crate::server::AppState;
use crate::service::{BoardService, StateUpdate};
use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{FromRequestParts, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use twosteps_store::{CursorState, History};

/// The caller's session, resolved from the `session_token` cookie.
///
/// Extraction never fails on a missing or unknown cookie; it yields an
/// anonymous session and the service decides whether that is acceptable.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Raw token from the cookie, if any.
    pub token: Option<String>,
    /// Username the token resolves to, if it is live.
    pub username: Option<String>,
}

impl Session {
    /// The signed-in username, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_headers(&parts.headers) else {
            return Ok(Session::default());
        };

        let lookup = token.clone();
        let username =
            blocking(&state.service, move |service| service.resolve_identity(&lookup)).await?;

        Ok(Session {
            token: Some(token),
            username,
        })
    }
}

/// Largest `/state` body read once the caller is known; matches axum's default.
const MAX_STATE_BODY: usize = 2 * 1024 * 1024;

/// Runs a service call on the blocking pool; the store does synchronous I/O.
async fn blocking<T, F>(service: &Arc<BoardService>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&BoardService) -> ServerResult<T> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// Parses a request body as a JSON object; anything else reads as empty.
fn json_object(body: &[u8]) -> serde_json::Map<String, Value> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
pub(crate) struct SignInResponse {
    message: &'static str,
    username: String,
}

#[derive(Serialize)]
pub(crate) struct StateResponse {
    username: String,
    #[serde(flatten)]
    state: CursorState,
}

#[derive(Serialize)]
pub(crate) struct HistoryResponse {
    history: History,
}

/// GET /
pub(crate) async fn index() -> Json<Value> {
    Json(json!({ "message": "Two Steps Main", "data": {} }))
}

/// GET /health
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "message": "Health check", "data": {} }))
}

/// POST /signin
pub(crate) async fn sign_in(State(state): State<AppState>, body: Bytes) -> ServerResult<Response> {
    let username = match json_object(&body).remove("username") {
        Some(Value::String(name)) => name,
        _ => return Err(ServerError::InvalidInput("username is required".into())),
    };

    let signed_in = blocking(&state.service, move |service| service.sign_in(&username)).await?;
    let cookie = session_cookie(&signed_in.token, state.config.secure_cookies);

    Ok((
        [(SET_COOKIE, cookie)],
        Json(SignInResponse {
            message: "Signed in",
            username: signed_in.username,
        }),
    )
        .into_response())
}

/// POST /signout
pub(crate) async fn sign_out(
    State(state): State<AppState>,
    session: Session,
) -> ServerResult<Response> {
    if let Some(token) = session.token {
        blocking(&state.service, move |service| service.sign_out(&token)).await?;
    }

    Ok((
        [(SET_COOKIE, clear_session_cookie())],
        Json(MessageResponse {
            message: "Signed out",
        }),
    )
        .into_response())
}

/// GET /state
pub(crate) async fn get_state(
    State(state): State<AppState>,
    session: Session,
) -> ServerResult<Json<StateResponse>> {
    let username = session.username;
    blocking(&state.service, move |service| {
        let cursor = service.get_state(username.as_deref())?;
        Ok(Json(StateResponse {
            username: username.unwrap_or_default(),
            state: cursor,
        }))
    })
    .await
}

/// POST /state
///
/// The body is only read after the session resolves, so an anonymous caller
/// gets 401 whatever the payload size.
pub(crate) async fn update_state(
    State(state): State<AppState>,
    session: Session,
    body: Body,
) -> ServerResult<Json<MessageResponse>> {
    let Some(username) = session.username().map(str::to_owned) else {
        return Err(ServerError::Unauthorized);
    };

    let body = to_bytes(body, MAX_STATE_BODY)
        .await
        .map_err(|e| ServerError::InvalidInput(format!("unreadable request body: {e}")))?;
    let mut fields = json_object(&body);
    let update = StateUpdate {
        x: fields.get("x").and_then(Value::as_i64),
        y: fields.get("y").and_then(Value::as_i64),
        color: match fields.remove("color") {
            Some(Value::String(color)) => Some(color),
            _ => None,
        },
    };

    blocking(&state.service, move |service| {
        service.update_state(Some(&username), update)
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "State updated",
    }))
}

/// GET /history
pub(crate) async fn get_history(
    State(state): State<AppState>,
    session: Session,
) -> ServerResult<Json<HistoryResponse>> {
    let username = session.username;
    let history =
        blocking(&state.service, move |service| service.get_history(username.as_deref())).await?;
    Ok(Json(HistoryResponse { history }))
}

/// POST /history/clear
pub(crate) async fn clear_history(
    State(state): State<AppState>,
    session: Session,
) -> ServerResult<Json<MessageResponse>> {
    let username = session.username;
    blocking(&state.service, move |service| {
        service.clear_history(username.as_deref())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "History cleared",
    }))
}
