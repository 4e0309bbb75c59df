//! In-memory store for testing.

use crate::backend::DocumentStore;
use crate::document::Document;
use crate::error::StoreResult;
use parking_lot::RwLock;

/// An in-memory store.
///
/// The document is kept in its serialized form so loads and saves go
/// through the same JSON path as [`super::FileStore`]. Suitable for:
/// - Unit tests
/// - Ephemeral boards that don't need persistence
///
/// # Example
///
/// ```rust
/// use twosteps_store::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// let doc = store.load().unwrap();
/// store.save(&doc).unwrap();
/// assert!(!store.data().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Vec<u8>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing raw content.
    ///
    /// Useful for testing corrupt-data handling.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the raw persisted bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl DocumentStore for InMemoryStore {
    fn load(&self) -> StoreResult<Document> {
        {
            let data = self.data.read();
            if !data.is_empty() {
                return Ok(serde_json::from_slice(&data)?);
            }
        }

        let doc = Document::new();
        self.save(&doc)?;
        Ok(doc)
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        let bytes = serde_json::to_vec(doc)?;
        *self.data.write() = bytes;
        Ok(())
    }
}
