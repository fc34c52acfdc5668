//! Durable client-side storage for session material.
//!
//! Session fields live as independent named entries. A writer always stores
//! the complete set in one batch so a reader never sees a half-written
//! session.

use crate::{LuminarisError, Result};
use rocksdb::{Options, DB};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Named-entry storage used by the session store
pub trait SessionStorage: Send + Sync {
    /// Read one entry
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write every entry in one atomic batch
    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove entries; missing keys are ignored
    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

/// Process-local storage, used in tests and when no data directory is configured
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| LuminarisError::StorageError("memory storage poisoned".into()))
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Persistent storage using RocksDB
pub struct RocksStorage {
    db: DB,
}

impl RocksStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| LuminarisError::StorageError(e.to_string()))?;

        info!(target: "session", "Session storage initialized");
        Ok(Self { db })
    }
}

impl SessionStorage for RocksStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key) {
            Ok(Some(data)) => {
                let value = serde_json::from_slice(&data)?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LuminarisError::StorageError(e.to_string())),
        }
    }

    fn write_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut batch = rocksdb::WriteBatch::default();
        for (key, value) in entries {
            let serialized = serde_json::to_vec(value)?;
            batch.put(key, serialized);
        }
        self.db
            .write(batch)
            .map_err(|e| LuminarisError::StorageError(e.to_string()))
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut batch = rocksdb::WriteBatch::default();
        for key in keys {
            batch.delete(key);
        }
        self.db
            .write(batch)
            .map_err(|e| LuminarisError::StorageError(e.to_string()))
    }
}
