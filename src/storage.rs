//! Durable key-value storage for todo
//!
//! The store keeps exactly two entries, each rewritten in full on every
//! change:
//!
//! ```text
//! <data_dir>/
//!   tasks.json      # "tasks" entry: JSON array of tasks
//!   tags.json       # "tags" entry: JSON array of tag names
//!   tasks.json.bak  # unreadable entry set aside before being rewritten
//!   .lock           # held while a snapshot is being written
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::lock::{self, DirLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Storage key for the task collection
pub const TASKS_KEY: &str = "tasks";

/// Storage key for the tag registry
pub const TAGS_KEY: &str = "tags";

/// String-keyed, string-valued durable storage.
pub trait KeyValueStore {
    /// Read an entry. A missing entry is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace an entry in full.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Replace several entries as one write.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Move an entry aside (`<key>.bak`) so the next `set` cannot destroy
    /// it. Missing entries are left alone.
    fn backup(&mut self, key: &str) -> Result<()>;
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid storage key '{key}'")))
    }
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path of the file backing `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write_entry(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.entry_path(key);
        lock::write_atomic(&path, value.as_bytes())?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "wrote storage entry");
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.entry_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let _lock = DirLock::acquire(&self.dir, self.lock_timeout_ms)?;
        self.write_entry(key, value)
    }

    fn set_all(&mut self, entries: &[(&str, &str)]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let _lock = DirLock::acquire(&self.dir, self.lock_timeout_ms)?;
        for (key, value) in entries {
            self.write_entry(key, value)?;
        }
        Ok(())
    }

    fn backup(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.entry_path(key);
        let backup = path.with_extension("json.bak");
        let _lock = DirLock::acquire(&self.dir, self.lock_timeout_ms)?;
        match fs::rename(&path, &backup) {
            Ok(()) => {
                tracing::warn!(key, path = %backup.display(), "set aside unreadable storage entry");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// In-process storage; contents vanish with the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry, e.g. to simulate previously persisted state.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn backup(&mut self, key: &str) -> Result<()> {
        if let Some(value) = self.entries.remove(key) {
            self.entries.insert(format!("{key}.bak"), value);
        }
        Ok(())
    }
}
