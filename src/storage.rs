//! Key-value persistence backends for client-side session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The token store never touches the filesystem directly. It talks to a
//! [`StorageBackend`], which mirrors the browser `localStorage` surface so
//! the same logic runs against memory, a JSON file, or nothing at all.
//!
//! TRADE-OFFS
//! ==========
//! Backends swallow their own I/O failures (logged at `warn`). A credential
//! write that fails leaves the caller logged out on the next hydrate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("state file io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// TRAIT
// =============================================================================

/// Synchronous string key-value storage.
///
/// The grouped operations exist so backends with a durable medium can
/// commit related keys in a single write. The defaults fall back to
/// per-key calls for backends where that is already atomic enough.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);

    fn set_items(&self, items: &[(&str, &str)]) {
        for (key, value) in items {
            self.set_item(key, value);
        }
    }

    fn remove_items(&self, keys: &[&str]) {
        for key in keys {
            self.remove_item(key);
        }
    }
}

// =============================================================================
// NO-OP
// =============================================================================

/// Backend for contexts with no persistent storage. Reads return `None`,
/// writes are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStorage;

impl StorageBackend for NoopStorage {
    fn get_item(&self, _key: &str) -> Option<String> {
        None
    }

    fn set_item(&self, _key: &str, _value: &str) {}

    fn remove_item(&self, _key: &str) {}
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    fn remove_item(&self, key: &str) {
        self.lock().remove(key);
    }

    fn set_items(&self, items: &[(&str, &str)]) {
        let mut map = self.lock();
        for (key, value) in items {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
    }

    fn remove_items(&self, keys: &[&str]) {
        let mut map = self.lock();
        for key in keys {
            map.remove(*key);
        }
    }
}

// =============================================================================
// FILE
// =============================================================================

/// JSON-object file backend. The whole map is cached in memory and
/// rewritten through a temp file + rename on every mutation, so grouped
/// writes land on disk together.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the state file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or is not a JSON
    /// object of strings. A missing file is not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, items: Mutex::new(items) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) {
        let mut items = self.items.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        apply(&mut items);
        if let Err(e) = write_atomically(&self.path, &items) {
            warn!(error = %e, path = %self.path.display(), "state file write failed");
        }
    }
}

fn write_atomically(path: &Path, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
    let raw = serde_json::to_string_pretty(items)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.mutate(|items| {
            items.insert(key.to_owned(), value.to_owned());
        });
    }

    fn remove_item(&self, key: &str) {
        self.mutate(|items| {
            items.remove(key);
        });
    }

    fn set_items(&self, pairs: &[(&str, &str)]) {
        self.mutate(|items| {
            for (key, value) in pairs {
                items.insert((*key).to_owned(), (*value).to_owned());
            }
        });
    }

    fn remove_items(&self, keys: &[&str]) {
        self.mutate(|items| {
            for key in keys {
                items.remove(*key);
            }
        });
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
