//! The board document and its records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered log of cursor snapshots for one user.
pub type History = Vec<CursorState>;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// When the user first signed in.
    pub created_at: DateTime<Utc>,
}

/// A cursor snapshot: position, color and the time it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    /// Horizontal position.
    pub x: i64,
    /// Vertical position.
    pub y: i64,
    /// Free-form color name or value.
    pub color: String,
    /// Server time of the write.
    pub timestamp: DateTime<Utc>,
}

impl CursorState {
    /// Default horizontal position for a new user.
    pub const INITIAL_X: i64 = 100;
    /// Default vertical position for a new user.
    pub const INITIAL_Y: i64 = 50;
    /// Default color for a new user.
    pub const INITIAL_COLOR: &'static str = "white";

    /// Creates a snapshot stamped with `timestamp`.
    pub fn new(x: i64, y: i64, color: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            x,
            y,
            color: color.into(),
            timestamp,
        }
    }

    /// The state every user starts with.
    pub fn initial(timestamp: DateTime<Utc>) -> Self {
        Self::new(
            Self::INITIAL_X,
            Self::INITIAL_Y,
            Self::INITIAL_COLOR,
            timestamp,
        )
    }

    /// Returns true if position and color match, ignoring the timestamp.
    pub fn same_position(&self, x: i64, y: i64, color: &str) -> bool {
        self.x == x && self.y == y && self.color == color
    }
}

/// The single aggregate persisted by a store.
///
/// Maps are ordered so the persisted JSON is stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Username -> user record.
    pub users: BTreeMap<String, UserRecord>,
    /// Session token -> username.
    pub sessions: BTreeMap<String, String>,
    /// Username -> current cursor state.
    pub states: BTreeMap<String, CursorState>,
    /// Username -> history of cursor states, oldest first.
    pub histories: BTreeMap<String, History>,
}

impl Document {
    /// Creates a document with four empty mappings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Verifies the referential invariants between the four mappings.
    ///
    /// Every session must point at a known user, and every user must have
    /// exactly one state and one history entry.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (token, username) in &self.sessions {
            if !self.users.contains_key(username) {
                return Err(format!(
                    "session {}... references unknown user {username:?}",
                    token.get(..8).unwrap_or(token.as_str())
                ));
            }
        }
        for username in self.users.keys() {
            if !self.states.contains_key(username) {
                return Err(format!("user {username:?} has no state"));
            }
            if !self.histories.contains_key(username) {
                return Err(format!("user {username:?} has no history"));
            }
        }
        Ok(())
    }
}
