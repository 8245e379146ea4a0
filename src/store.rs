//! Shared Key/Value Store
//!
//! A dynamically typed container shared by every stage and action of a run.
//! Values of any `'static` type can be stored; the type is checked again when
//! a value is read back with [`Store::get`].
//!
//! Writes go through `&self` so the store can be mutated through the shared
//! reference an [`ActionContext`](crate::ActionContext) hands out.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::StoreError;

/// Type name recorded for entries written with [`Store::put_nil`].
const NIL_TYPE: &str = "nil";

type Value = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Entry {
    /// `None` marks an explicit nil value.
    value: Option<Value>,
    type_name: &'static str,
}

/// Controls how [`Store::merge_with`] treats its source entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Replace keys that already exist in the target.
    pub overwrite: bool,
    /// Leave out source entries holding a nil value.
    pub skip_nil: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            skip_nil: false,
        }
    }
}

/// Typed key/value store with copy and merge semantics.
///
/// # Example
///
/// ```
/// use stagerunner::{Store, StoreError};
///
/// let store = Store::new();
/// store.put("items", vec!["a".to_string(), "b".to_string()]);
///
/// let items: Vec<String> = store.get("items").unwrap();
/// assert_eq!(items.len(), 2);
///
/// assert!(matches!(store.get::<i32>("items"), Err(StoreError::TypeMismatch { .. })));
/// assert!(matches!(store.get::<i32>("count"), Err(StoreError::KeyNotFound(_))));
/// ```
#[derive(Default)]
pub struct Store {
    entries: RwLock<HashMap<String, Entry>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a value, replacing whatever the key held before.
    pub fn put<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        let entry = Entry {
            value: Some(Arc::new(value)),
            type_name: type_name::<T>(),
        };
        self.write().insert(key.into(), entry);
    }

    /// Stores an explicit nil value under `key`.
    pub fn put_nil(&self, key: impl Into<String>) {
        let entry = Entry {
            value: None,
            type_name: NIL_TYPE,
        };
        self.write().insert(key.into(), entry);
    }

    /// Reads a value back as `T`.
    ///
    /// # Errors
    ///
    /// * [`StoreError::KeyNotFound`] - No entry exists for `key`
    /// * [`StoreError::TypeMismatch`] - The entry is nil or holds another type
    pub fn get<T>(&self, key: &str) -> Result<T, StoreError>
    where
        T: Any + Clone,
    {
        let entries = self.read();
        let entry = entries
            .get(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        entry
            .value
            .as_ref()
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| mismatch::<T>(key, entry))
    }

    /// Reads a value as a shared handle, without cloning it.
    pub fn get_shared<T>(&self, key: &str) -> Result<Arc<T>, StoreError>
    where
        T: Any + Send + Sync,
    {
        let entries = self.read();
        let entry = entries
            .get(key)
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;

        match &entry.value {
            Some(value) => Arc::clone(value)
                .downcast::<T>()
                .map_err(|_| mismatch::<T>(key, entry)),
            None => Err(mismatch::<T>(key, entry)),
        }
    }

    /// Reads a value, falling back to `default` when it is missing or of another type.
    pub fn get_or<T>(&self, key: &str, default: T) -> T
    where
        T: Any + Clone,
    {
        self.get(key).unwrap_or(default)
    }

    /// Returns true if `key` has an entry, nil entries included.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Returns true if `key` holds an explicit nil value.
    pub fn is_nil(&self, key: &str) -> bool {
        self.read()
            .get(key)
            .map(|entry| entry.value.is_none())
            .unwrap_or(false)
    }

    /// Name of the type stored under `key`.
    pub fn type_name_of(&self, key: &str) -> Option<&'static str> {
        self.read().get(key).map(|entry| entry.type_name)
    }

    /// Removes an entry. Returns true if the key existed.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Returns all keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Copies every entry of `source` into this store, overwriting existing keys.
    ///
    /// Returns the number of keys written.
    pub fn merge(&self, source: &Store) -> usize {
        self.merge_with(source, MergeOptions::default())
    }

    /// Copies entries of `source` into this store according to `options`.
    ///
    /// Returns the number of keys written.
    pub fn merge_with(&self, source: &Store, options: MergeOptions) -> usize {
        // Snapshot first so merging a store into itself cannot deadlock.
        let incoming: Vec<(String, Entry)> = source
            .read()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();

        let mut entries = self.write();
        let mut written = 0;

        for (key, entry) in incoming {
            if options.skip_nil && entry.value.is_none() {
                continue;
            }
            if !options.overwrite && entries.contains_key(&key) {
                continue;
            }
            entries.insert(key, entry);
            written += 1;
        }

        written
    }
}

fn mismatch<T>(key: &str, entry: &Entry) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_string(),
        expected: type_name::<T>(),
        found: entry.type_name,
    }
}

/// Cloning produces an independent store: values are shared, keys are not.
impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.read().clone()),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.read();
        let mut keys: Vec<_> = entries.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));

        f.debug_map()
            .entries(keys.into_iter().map(|(key, entry)| (key, entry.type_name)))
            .finish()
    }
}
