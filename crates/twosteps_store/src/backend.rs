//! Store trait definition.

use crate::document::Document;
use crate::error::StoreResult;

/// Durable load/save of the board [`Document`].
///
/// Stores do not interpret the document. The session service owns all
/// semantics; a store only guarantees that what was saved is what gets
/// loaded back.
///
/// # Invariants
///
/// - `load` on a store with nothing persisted yields an empty document and
///   persists it before returning
/// - `save` replaces the whole persisted document; a concurrent `load`
///   never observes a partially written one
/// - Stores must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait DocumentStore: Send + Sync {
    /// Loads the full document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptData`](crate::StoreError::CorruptData) if
    /// the persisted content cannot be parsed, or an I/O error if it cannot
    /// be read or the initial document cannot be written.
    fn load(&self) -> StoreResult<Document>;

    /// Saves the full document, overwriting the persisted copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn save(&self, doc: &Document) -> StoreResult<()>;
}
