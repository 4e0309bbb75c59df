//! Test fixtures and board helpers.
//!
//! Provides convenience functions for setting up a board service over
//! a throwaway store.

use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use twosteps_server::BoardService;
use twosteps_store::{Document, DocumentStore, FileStore, InMemoryStore};

/// A board service with automatic cleanup.
pub struct TestBoard {
    /// The service under test.
    pub service: Arc<BoardService>,
    /// The store behind the service, for direct inspection.
    pub store: Arc<dyn DocumentStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

/// A signed-in user: the token and the username it resolves to.
#[derive(Debug, Clone)]
pub struct SignedInUser {
    /// Session token.
    pub token: String,
    /// Username.
    pub username: String,
}

impl SignedInUser {
    /// The username as a resolved identity.
    pub fn identity(&self) -> Option<&str> {
        Some(&self.username)
    }
}

impl TestBoard {
    /// Creates a board over an in-memory store.
    pub fn memory() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        Self {
            service: Arc::new(BoardService::new(Arc::clone(&store))),
            store,
            _temp_dir: None,
        }
    }

    /// Creates a board over a JSON file in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("board.json");
        let store: Arc<dyn DocumentStore> =
            Arc::new(FileStore::open(&path).expect("Failed to open file store"));

        Self {
            service: Arc::new(BoardService::new(Arc::clone(&store))),
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the data file path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("board.json"))
    }

    /// Signs `username` in, panicking on failure.
    pub fn sign_in_as(&self, username: &str) -> SignedInUser {
        let signed = self.service.sign_in(username).expect("Failed to sign in");
        SignedInUser {
            token: signed.token,
            username: signed.username,
        }
    }

    /// Loads the current document straight from the store.
    pub fn document(&self) -> Document {
        self.store.load().expect("Failed to load document")
    }
}

impl std::ops::Deref for TestBoard {
    type Target = BoardService;

    fn deref(&self) -> &Self::Target {
        &self.service
    }
}

/// Runs a test with a fresh in-memory board.
///
/// # Example
///
/// ```rust,ignore
/// use twosteps_testkit::with_board;
///
/// #[test]
/// fn my_test() {
///     with_board(|board| {
///         board.sign_in_as("alice");
///     });
/// }
/// ```
pub fn with_board<F, R>(f: F) -> R
where
    F: FnOnce(&TestBoard) -> R,
{
    let board = TestBoard::memory();
    f(&board)
}
