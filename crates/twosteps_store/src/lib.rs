//! # Two Steps Store
//!
//! Persistent document model for the Two Steps board.
//!
//! All board state lives in a single [`Document`] holding four mappings:
//! users, sessions, per-user cursor states and per-user histories. The
//! document is always loaded and saved as one unit; there is no incremental
//! update.
//!
//! ## Design Principles
//!
//! - Stores are dumb: they load and save whole documents, nothing more
//! - Stores must be `Send + Sync` so a service can share them across requests
//! - Serialization is plain JSON with a stable key order
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral boards
//! - [`FileStore`] - A single JSON file, replaced atomically on every save
//!
//! ## Example
//!
//! ```rust
//! use twosteps_store::{DocumentStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! let doc = store.load().unwrap();
//! assert_eq!(doc.user_count(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod document;
mod error;
mod file;
mod memory;

pub use backend::DocumentStore;
pub use document::{CursorState, Document, History, UserRecord};
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
