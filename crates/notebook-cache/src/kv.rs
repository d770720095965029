//! Key-value store wrapper with automatic serialization.

use std::path::Path;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::store::{FileStore, MemoryStore, Store};
use crate::CacheError;

/// Type-safe cache over a [`Store`] backend.
///
/// Provides automatic JSON serialization for any type that implements
/// `Serialize` and `DeserializeOwned`. Cloning is cheap and clones share
/// the same backend.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn Store>,
}

impl Cache {
    /// Wrap an existing backend.
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Open an in-memory cache.
    ///
    /// # Example
    ///
    /// ```rust
    /// let cache = notebook_cache::Cache::memory();
    /// assert!(!cache.exists("anything").unwrap());
    /// ```
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Open a cache persisted to a JSON file.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache = Cache::open_file("data/store.json")?;
    /// ```
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Ok(Self::new(FileStore::open(path)?))
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let items: Option<Vec<CartItem>> = cache.get("notebook-cart")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a value in the cache.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// cache.set("notebook-cart", &items)?;
    /// ```
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key)
    }

    /// Check if a key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.store.exists(key)
    }

    /// Get all keys in the cache.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.store.keys()
    }

    /// Get all keys starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust
/// use notebook_cache::cache_key;
/// let session = "abc";
/// assert_eq!(cache_key!("notebook-cart", session), "notebook-cart:abc");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Line {
        id: u64,
        quantity: i64,
    }

    #[test]
    fn test_typed_roundtrip() {
        let cache = Cache::memory();
        let lines = vec![Line { id: 1, quantity: 2 }, Line { id: 7, quantity: 1 }];
        cache.set("lines", &lines).unwrap();

        let loaded: Vec<Line> = cache.get("lines").unwrap().unwrap();
        assert_eq!(loaded, lines);
    }

    #[test]
    fn test_missing_key() {
        let cache = Cache::memory();
        let value: Option<Vec<Line>> = cache.get("nope").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_wrong_shape_is_serialize_error() {
        let cache = Cache::memory();
        cache.set("lines", "not a list").unwrap();
        let result: Result<Option<Vec<Line>>, _> = cache.get("lines");
        assert!(matches!(result, Err(CacheError::SerializeError(_))));
    }

    #[test]
    fn test_clones_share_backend() {
        let cache = Cache::memory();
        let other = cache.clone();
        cache.set("k", &1).unwrap();
        assert_eq!(other.get::<i32>("k").unwrap(), Some(1));
    }

    #[test]
    fn test_keys_with_prefix() {
        let cache = Cache::memory();
        cache.set("token:a", &1).unwrap();
        cache.set("token:b", &2).unwrap();
        cache.set("cart:a", &3).unwrap();
        assert_eq!(cache.keys_with_prefix("token:").unwrap(), vec!["token:a", "token:b"]);
    }

    #[test]
    fn test_cache_key_macro() {
        let key = cache_key!("token", "api_access", 42);
        assert_eq!(key, "token:api_access:42");
    }
}
