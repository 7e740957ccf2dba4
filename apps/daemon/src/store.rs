//! Persistent key/value store backing the daemon.
//!
//! One JSON object map per daemon, loaded fully at open and rewritten
//! atomically (temp file + rename) on every mutation. A corrupt or
//! unreadable file degrades to the empty map with a warning — startup
//! integrity checks repair from there; nothing here is fatal.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

/// Top-level schema keys. The store holds exactly this fixed schema;
/// surfaces never invent keys of their own.
pub mod keys {
    pub const PROFILE: &str = "profile";
    pub const SETTINGS: &str = "settings";
    pub const HISTORY_LOG: &str = "historyLog";
    pub const BACKUP_SLOT: &str = "backupSlot";
    pub const GENERATION_STATUS: &str = "generationStatus";
    pub const LAST_GENERATED_AT: &str = "lastGeneratedAt";
    pub const LAST_ERROR: &str = "lastError";

    /// The objects a working installation cannot run without.
    pub const ESSENTIAL: [&str; 3] = [PROFILE, SETTINGS, HISTORY_LOG];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct Store {
    path: PathBuf,
    map: Mutex<Map<String, Value>>,
}

impl Store {
    /// Opens the store file, creating the parent directory if needed.
    /// A missing file starts empty; a malformed file is treated as empty
    /// rather than refusing to start.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let map = match std::fs::read(&path) {
            Ok(raw) => match serde_json::from_slice::<Map<String, Value>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("store file {} is unreadable ({e}), starting empty", path.display());
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("could not read store file {} ({e}), starting empty", path.display());
                Map::new()
            }
        };

        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Typed read. A malformed stored value degrades to `None` with a
    /// warning; callers fall back to defaults.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("stored value for '{key}' does not match its schema ({e}), ignoring");
                None
            }
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        let mut map = self.lock();
        map.insert(key.to_string(), value);
        persist(&self.path, &map)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.lock();
        map.remove(key);
        persist(&self.path, &map)
    }

    /// Applies a multi-key mutation and persists once. The closure runs
    /// under the store lock, so read-modify-write sequences built on it
    /// are atomic with respect to other store callers.
    pub fn update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut map = self.lock();
        f(&mut map);
        persist(&self.path, &map)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Full clone of the store map, for backup snapshots.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().clone()
    }
}

/// Atomic whole-file rewrite: serialize into a temp file in the same
/// directory, then rename over the live file.
fn persist(path: &Path, map: &Map<String, Value>) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(tmp.as_file(), map)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
