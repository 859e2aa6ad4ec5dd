use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};

/// Key under which the photo list is stored
const PHOTOS_KEY: &str = "photos";

/// Prefix of per-photo marker keys
const MARKERS_KEY_PREFIX: &str = "markers_";

/// A key in the host's key-value storage.
///
/// Keys are only built through the constructors below so that every store
/// agrees on the layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// The global photo list
    pub fn photos() -> Self {
        Self(PHOTOS_KEY.to_string())
    }

    /// The confirmed markers of one photo (`markers_<photoId>`)
    pub fn markers(photo_id: &str) -> Self {
        Self(format!("{MARKERS_KEY_PREFIX}{photo_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Simple get/set/delete storage supplied by the host.
///
/// Calls may block; stores only invoke them from blocking worker threads.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<String>>;
    fn set(&self, key: &StorageKey, value: &str) -> StorageResult<()>;
    fn delete(&self, key: &StorageKey) -> StorageResult<()>;
}

/// In-process storage, used by tests and hosts without a disk
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value (bypasses any encoding)
    pub fn with_entry(self, key: &StorageKey, value: &str) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.as_str().to_string(), value.to_string());
        }
        self
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key.as_str()))
            .unwrap_or(false)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key.as_str()).cloned())
    }

    fn set(&self, key: &StorageKey, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.as_str().to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key.as_str());
        Ok(())
    }
}

/// SQLite-backed key-value storage.
///
/// The database file is created in the user's data directory by default:
/// - Linux: ~/.local/share/photo-pins/photo_pins.db
/// - macOS: ~/Library/Application Support/photo-pins/photo_pins.db
/// - Windows: %APPDATA%\photo-pins\photo_pins.db
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) the database at the default location
    pub fn new() -> StorageResult<Self> {
        let db_path = Self::default_db_path().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine user data directory",
            )
        })?;
        Self::open(db_path)
    }

    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = path.as_ref().to_path_buf();

        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "storage opened");

        let storage = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// A private database that lives as long as this value
    pub fn in_memory() -> StorageResult<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Where the database lives when no path is given
    pub fn default_db_path() -> Option<PathBuf> {
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("photo-pins");
        path.push("photo_pins.db");
        Some(path)
    }

    /// Get the path to the database file (`None` for in-memory databases)
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key     TEXT PRIMARY KEY NOT NULL,
                value   TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStorage {
    fn get(&self, key: &StorageKey) -> StorageResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &StorageKey, value: &str) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key.as_str(), value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", [key.as_str()])?;
        Ok(())
    }
}

// Implement Debug for better error messages
impl fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("db_path", &self.db_path)
            .finish()
    }
}
