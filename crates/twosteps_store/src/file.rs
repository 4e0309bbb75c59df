//! File-based store for persistent boards.

use crate::backend::DocumentStore;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// A store backed by a single JSON file.
///
/// The data file sits next to two siblings:
///
/// ```text
/// <dir>/
/// ├─ board.json        # The document
/// ├─ board.json.lock   # Advisory lock for single-writer
/// └─ board.json.tmp    # Transient, only exists during a save
/// ```
///
/// # Durability
///
/// `save` uses write-then-rename:
/// 1. Write to the temporary file
/// 2. Sync the temporary file to disk
/// 3. Rename it over the data file
/// 4. Fsync the directory so the rename itself is durable
///
/// A reader therefore sees either the previous or the new document, never a
/// truncated one.
///
/// # Example
///
/// ```no_run
/// use twosteps_store::{DocumentStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("data/board.json")).unwrap();
/// let doc = store.load().unwrap();
/// store.save(&doc).unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    temp_path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl FileStore {
    /// Opens a store at `path`, creating parent directories if needed.
    ///
    /// The data file itself is only created on the first `load` or `save`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Locked`] if another process already holds the
    /// store, or an I/O error if directories or the lock file cannot be
    /// created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = sibling(path, "lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        // Non-blocking: a second server on the same file is a setup mistake
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            temp_path: sibling(path, "tmp"),
            _lock_file: lock_file,
        })
    }

    /// Reads the document at `path` without locking or writing anything.
    ///
    /// A missing or empty file yields an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptData`] if the file cannot be parsed.
    pub fn peek(path: &Path) -> StoreResult<Document> {
        Ok(read_document(path)?.unwrap_or_default())
    }

    /// Returns the path to the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `data` to the temp sibling, syncs it and renames it over the file.
    fn replace_with(&self, data: &[u8]) -> StoreResult<()> {
        let mut file = File::create(&self.temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        // Directory fsync is not supported outside unix
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> StoreResult<Document> {
        match read_document(&self.path)? {
            Some(doc) => Ok(doc),
            None => {
                tracing::info!(path = %self.path.display(), "initializing empty board document");
                let doc = Document::new();
                self.save(&doc)?;
                Ok(doc)
            }
        }
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(doc)?;

        if let Err(e) = self.replace_with(&data) {
            // Best effort; the live file is untouched either way
            let _ = fs::remove_file(&self.temp_path);
            return Err(e);
        }
        self.sync_directory()?;

        tracing::trace!(bytes = data.len(), "saved board document");
        Ok(())
    }
}

/// Reads and parses the file, `None` if it is missing or empty.
fn read_document(path: &Path) -> StoreResult<Option<Document>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut data = Vec::new();
    file.read_to_end(&mut data)?;

    if data.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_slice(&data)?))
}

/// `board.json` -> `board.json.<ext>`
fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CursorState, UserRecord};
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn load_initializes_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        let store = FileStore::open(&path).unwrap();
        assert!(!path.exists());

        let doc = store.load().unwrap();
        assert_eq!(doc, Document::new());
        assert!(path.exists());

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["users"], serde_json::json!({}));
        assert_eq!(raw["histories"], serde_json::json!({}));
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        let now = Utc::now();

        {
            let store = FileStore::open(&path).unwrap();
            let mut doc = store.load().unwrap();
            doc.users
                .insert("alice".into(), UserRecord { created_at: now });
            doc.states.insert("alice".into(), CursorState::initial(now));
            doc.histories
                .insert("alice".into(), vec![CursorState::initial(now)]);
            store.save(&doc).unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        let doc = store.load().unwrap();
        assert_eq!(doc.user_count(), 1);
        assert_eq!(doc.states["alice"].color, "white");
        assert!(!sibling(&path, "tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.load(), Err(StoreError::CorruptData(_))));
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, br#"{"users": [], "sessions": {}}"#).unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.load(), Err(StoreError::CorruptData(_))));
    }

    #[test]
    fn empty_file_treated_as_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, b"").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), Document::new());
        assert!(!fs::read(&path).unwrap().is_empty());
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        let _first = FileStore::open(&path).unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Locked(_))
        ));
    }

    #[test]
    fn create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("board.json");

        let store = FileStore::open(&path).unwrap();
        store.load().unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn peek_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        let doc = FileStore::peek(&path).unwrap();
        assert_eq!(doc, Document::new());
        assert!(!path.exists());
    }

    #[test]
    fn peek_ignores_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        let store = FileStore::open(&path).unwrap();
        store.load().unwrap();
        assert!(FileStore::peek(&path).is_ok());
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        let now = Utc::now();

        let mut store = FileStore::open(&path).unwrap();
        let before = store.load().unwrap();

        // Temp sibling in a directory that does not exist
        store.temp_path = dir.path().join("gone").join("board.json.tmp");
        let mut doc = before.clone();
        doc.users
            .insert("alice".into(), UserRecord { created_at: now });
        assert!(matches!(store.save(&doc), Err(StoreError::Io(_))));

        assert_eq!(store.load().unwrap(), before);
        assert_eq!(FileStore::peek(&path).unwrap(), before);
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        let store = FileStore::open(&path).unwrap();
        // A directory in place of the data file makes the rename fail
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        assert!(matches!(
            store.save(&Document::new()),
            Err(StoreError::Io(_))
        ));
        assert!(!sibling(&path, "tmp").exists());
        assert!(path.join("keep").exists());
    }
}
