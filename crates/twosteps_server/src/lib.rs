//! # Two Steps Server
//!
//! HTTP backend for the Two Steps shared board.
//!
//! This crate provides:
//! - Username sign-in issuing opaque session tokens (carried in a cookie)
//! - Per-user cursor state (position + color) with an append-only history
//! - JSON endpoints served with axum
//!
//! # Architecture
//!
//! All state lives in one [`Document`](twosteps_store::Document) behind a
//! [`DocumentStore`](twosteps_store::DocumentStore). Every request that
//! touches state goes through [`BoardService`], which runs
//! load-mutate-save as a single critical section:
//!
//! ```text
//! request -> resolve session cookie -> lock -> load -> mutate -> save -> unlock -> JSON
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use twosteps_server::{BoardService, StateUpdate};
//! use twosteps_store::InMemoryStore;
//!
//! let service = BoardService::new(Arc::new(InMemoryStore::new()));
//! let signed_in = service.sign_in("alice").unwrap();
//!
//! let user = service.resolve_identity(&signed_in.token).unwrap();
//! service
//!     .update_state(user.as_deref(), StateUpdate::new(5, 7, "red"))
//!     .unwrap();
//! assert_eq!(service.get_history(user.as_deref()).unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;
mod service;

pub use auth::{
    clear_session_cookie, generate_token, session_cookie, token_from_headers, SESSION_COOKIE,
    TOKEN_BYTES,
};
pub use config::{ConfigError, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::Session;
pub use server::{router, serve, AppState};
pub use service::{BoardService, Clock, SignIn, StateUpdate, SystemClock};
