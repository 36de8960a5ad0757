//! # Key-Value Store
//!
//! Local persistence for session state. The cart ledger and the pricing
//! authority write through to a store after every mutation.
//!
//! Two keys are used:
//! - [`CART_KEY`]: JSON array of cart line items
//! - [`PRICING_MODE_KEY`]: `"national"` or `"international"`

use crate::error::{ShopError, ShopResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key holding the persisted cart
pub const CART_KEY: &str = "cart";

/// Key holding the persisted pricing mode
pub const PRICING_MODE_KEY: &str = "pricing_mode";

/// String key-value storage with interior mutability, shared behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key was never written or was removed
    fn get(&self, key: &str) -> ShopResult<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> ShopResult<()>;

    /// Erase a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ShopResult<()>;
}

/// In-process store, lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ShopResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ShopResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ShopResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> ShopResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory this store writes into
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ShopResult<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ShopError::Storage(format!("invalid store key: {:?}", key)));
        }
        Ok(self.root.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ShopResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> ShopResult<()> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash never leaves a half-written value.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> ShopResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get(CART_KEY).unwrap(), None);

        store.set(CART_KEY, "[]").unwrap();
        assert_eq!(store.get(CART_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(store.len(), 1);

        store.remove(CART_KEY).unwrap();
        store.remove(CART_KEY).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("session-1")).unwrap();
        store.set(PRICING_MODE_KEY, "international").unwrap();

        let reopened = FileStore::open(dir.path().join("session-1")).unwrap();
        assert_eq!(
            reopened.get(PRICING_MODE_KEY).unwrap().as_deref(),
            Some("international")
        );

        reopened.remove(PRICING_MODE_KEY).unwrap();
        assert_eq!(store.get(PRICING_MODE_KEY).unwrap(), None);
        reopened.remove(PRICING_MODE_KEY).unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        let err = store.set("../escape", "x").unwrap_err();
        assert!(matches!(err, ShopError::Storage(_)));
        assert!(store.get("").is_err());
    }
}
