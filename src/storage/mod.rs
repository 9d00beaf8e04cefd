//! Durable key-value slots for settings and chat sessions
//!
//! Each slot holds one JSON document that is overwritten as a whole on
//! every write, so a crash can lose the latest update but never leave a
//! partially written value behind.

use crate::error::{Result, ManomanError};
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Slot holding the serialized `ApplicationSettings`.
pub const SETTINGS_KEY: &str = "man-o-man-settings";

/// Slot holding the serialized chat sessions.
pub const SESSIONS_KEY: &str = "chat_sessions";

/// Whole-value string storage addressed by fixed keys
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key-value store backed by an embedded `sled` database
pub struct SledStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create a store in the user's data directory
    ///
    /// `MANOMAN_DATA_DIR` overrides the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns `ManomanError::Storage` if the directory cannot be determined
    /// or the database cannot be opened.
    pub fn open_default() -> Result<Self> {
        Self::new(default_data_dir()?.join("store"))
    }

    /// Open or create a store at `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use manoman::storage::{KeyValueStore, SledStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SledStore::new(dir.path().join("store")).unwrap();
    /// store.set("greeting", "hello").unwrap();
    /// assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ManomanError::Storage(format!("Failed to create data directory: {}", e))
            })?;
        }

        let db = sled::open(&path)
            .map_err(|e| ManomanError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!(path = %path.display(), "Opened key-value store");
        Ok(Self { db, path })
    }

    /// Location of the database on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(bytes) = self
            .db
            .get(key.as_bytes())
            .map_err(|e| ManomanError::Storage(format!("Get failed: {}", e)))?
        else {
            return Ok(None);
        };

        let value = String::from_utf8(bytes.to_vec())
            .map_err(|e| ManomanError::Storage(format!("Stored value is not UTF-8: {}", e)))?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| ManomanError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ManomanError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ManomanError::Storage(format!("Remove failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| ManomanError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

/// Volatile store, used when nothing should outlive the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| ManomanError::Storage("memory store lock poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| ManomanError::Storage("memory store lock poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| ManomanError::Storage("memory store lock poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

/// Resolve the data directory, honouring `MANOMAN_DATA_DIR`.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("MANOMAN_DATA_DIR") {
        return Ok(PathBuf::from(override_path));
    }

    let proj_dirs = ProjectDirs::from("com", "manoman", "manoman")
        .ok_or_else(|| ManomanError::Storage("Could not determine data directory".into()))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
