//! Session and cursor-state service.
//!
//! Every operation runs the same cycle under one lock:
//!
//! 1. Load the full document from the store
//! 2. Read or mutate the caller's slice of it
//! 3. Save the full document back (mutations only)
//!
//! Holding a single gate around the whole cycle means two requests can
//! never interleave their load and save phases, so no update is lost.

use crate::auth::generate_token;
use crate::error::{ServerError, ServerResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use twosteps_store::{CursorState, Document, DocumentStore, History, UserRecord};

/// Source of write timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    /// Freshly minted session token.
    pub token: String,
    /// The (trimmed) username that signed in.
    pub username: String,
}

/// A requested cursor update. Every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    /// Horizontal position.
    pub x: Option<i64>,
    /// Vertical position.
    pub y: Option<i64>,
    /// Color.
    pub color: Option<String>,
}

impl StateUpdate {
    /// Creates a complete update.
    pub fn new(x: i64, y: i64, color: impl Into<String>) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            color: Some(color.into()),
        }
    }

    /// Returns the fields, or the first missing field's name.
    fn into_parts(self) -> Result<(i64, i64, String), &'static str> {
        let x = self.x.ok_or("x")?;
        let y = self.y.ok_or("y")?;
        let color = self.color.ok_or("color")?;
        Ok((x, y, color))
    }
}

/// The board service: sign-in, sign-out, cursor state and history.
pub struct BoardService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    /// Serializes whole load-mutate-save cycles.
    gate: Mutex<()>,
}

impl BoardService {
    /// Creates a service over `store` using wall-clock timestamps.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a service with a custom clock.
    pub fn with_clock(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            gate: Mutex::new(()),
        }
    }

    /// Signs `username` in and returns a new session token.
    ///
    /// A new username gets a user record, the initial cursor state and a
    /// history seeded with that state. An existing username keeps its state
    /// and history; only a new session is added.
    pub fn sign_in(&self, username: &str) -> ServerResult<SignIn> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServerError::InvalidInput("username is required".into()));
        }

        let now = self.clock.now();
        let token = generate_token();

        self.mutate(|doc| {
            if !doc.users.contains_key(username) {
                tracing::info!(username, "registering new user");
                let initial = CursorState::initial(now);
                doc.users
                    .insert(username.to_string(), UserRecord { created_at: now });
                doc.states.insert(username.to_string(), initial.clone());
                doc.histories.insert(username.to_string(), vec![initial]);
            }
            doc.sessions.insert(token.clone(), username.to_string());
            Ok(())
        })?;

        tracing::info!(username, "signed in");
        Ok(SignIn {
            token,
            username: username.to_string(),
        })
    }

    /// Removes `token` from the live sessions. Unknown tokens are ignored.
    pub fn sign_out(&self, token: &str) -> ServerResult<()> {
        self.mutate(|doc| {
            if let Some(username) = doc.sessions.remove(token) {
                tracing::info!(username = %username, "signed out");
            }
            Ok(())
        })
    }

    /// Looks up the username owning `token`.
    pub fn resolve_identity(&self, token: &str) -> ServerResult<Option<String>> {
        self.read(|doc| Ok(doc.sessions.get(token).cloned()))
    }

    /// Returns the caller's current cursor state.
    pub fn get_state(&self, username: Option<&str>) -> ServerResult<CursorState> {
        let username = require(username)?;
        self.read(|doc| {
            doc.states
                .get(username)
                .cloned()
                .ok_or_else(|| ServerError::NotFound(format!("no state for user {username}")))
        })
    }

    /// Replaces the caller's cursor state and appends it to their history.
    ///
    /// Rejects the update without touching the store if any field is
    /// missing.
    pub fn update_state(&self, username: Option<&str>, update: StateUpdate) -> ServerResult<()> {
        let username = require(username)?;
        let (x, y, color) = update
            .into_parts()
            .map_err(|field| ServerError::InvalidInput(format!("missing field: {field}")))?;

        let state = CursorState::new(x, y, color, self.clock.now());
        self.mutate(|doc| {
            doc.histories
                .entry(username.to_string())
                .or_default()
                .push(state.clone());
            doc.states.insert(username.to_string(), state);
            Ok(())
        })?;

        tracing::debug!(username, x, y, "state updated");
        Ok(())
    }

    /// Returns the caller's history, oldest first. Empty if none recorded.
    pub fn get_history(&self, username: Option<&str>) -> ServerResult<History> {
        let username = require(username)?;
        self.read(|doc| Ok(doc.histories.get(username).cloned().unwrap_or_default()))
    }

    /// Empties the caller's history.
    pub fn clear_history(&self, username: Option<&str>) -> ServerResult<()> {
        let username = require(username)?;
        self.mutate(|doc| {
            doc.histories.insert(username.to_string(), Vec::new());
            Ok(())
        })?;

        tracing::debug!(username, "history cleared");
        Ok(())
    }

    /// Loads the document and runs `f` without saving.
    fn read<T>(&self, f: impl FnOnce(&Document) -> ServerResult<T>) -> ServerResult<T> {
        let _guard = self.gate.lock();
        let doc = self.store.load()?;
        f(&doc)
    }

    /// Loads, mutates and saves the document as one critical section.
    ///
    /// Nothing is saved if `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> ServerResult<T>) -> ServerResult<T> {
        let _guard = self.gate.lock();
        let mut doc = self.store.load()?;
        let out = f(&mut doc)?;
        self.store.save(&doc)?;
        Ok(out)
    }
}

fn require(username: Option<&str>) -> ServerResult<&str> {
    username.ok_or(ServerError::Unauthorized)
}
