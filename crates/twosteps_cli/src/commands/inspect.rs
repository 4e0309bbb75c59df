//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use twosteps_store::{Document, FileStore};

/// Board inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data file path.
    pub path: String,
    /// Whether the data file exists.
    pub exists: bool,
    /// Number of registered users.
    pub user_count: usize,
    /// Number of live sessions.
    pub session_count: usize,
    /// Per-user details, ordered by username.
    pub users: Vec<UserStats>,
    /// First invariant violation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<String>,
}

/// Statistics for a single user.
#[derive(Debug, Serialize)]
pub struct UserStats {
    /// Username.
    pub username: String,
    /// Number of live sessions for this user.
    pub sessions: usize,
    /// Number of history entries.
    pub history_len: usize,
    /// Current position and color, as `x,y color`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Runs the inspect command.
///
/// Reads the data file without locking it, so it is safe to run next to a
/// live server.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let doc = FileStore::peek(path)?;
    let result = inspect(path, &doc);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    if let Some(violation) = result.violation {
        return Err(format!("board is inconsistent: {violation}").into());
    }

    Ok(())
}

fn inspect(path: &Path, doc: &Document) -> InspectResult {
    let users = doc
        .users
        .keys()
        .map(|username| UserStats {
            username: username.clone(),
            sessions: doc.sessions.values().filter(|u| *u == username).count(),
            history_len: doc.histories.get(username).map_or(0, Vec::len),
            state: doc
                .states
                .get(username)
                .map(|s| format!("{},{} {}", s.x, s.y, s.color)),
        })
        .collect();

    InspectResult {
        path: path.display().to_string(),
        exists: path.exists(),
        user_count: doc.user_count(),
        session_count: doc.session_count(),
        users,
        violation: doc.check_invariants().err(),
    }
}

fn print_text_output(result: &InspectResult) {
    println!("Two Steps Board");
    println!("===============");
    println!("Path:     {}", result.path);
    if !result.exists {
        println!("          (no data file yet)");
    }
    println!("Users:    {}", result.user_count);
    println!("Sessions: {}", result.session_count);

    if !result.users.is_empty() {
        println!();
        println!(
            "{:<24} {:>8} {:>8}  {}",
            "USER", "SESSIONS", "HISTORY", "STATE"
        );
        for user in &result.users {
            println!(
                "{:<24} {:>8} {:>8}  {}",
                user.username,
                user.sessions,
                user.history_len,
                user.state.as_deref().unwrap_or("-")
            );
        }
    }

    println!();
    match &result.violation {
        Some(violation) => println!("Consistency: FAILED ({violation})"),
        None => println!("Consistency: OK"),
    }
}
