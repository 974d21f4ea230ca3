//! In-memory [`KeyValueStore`] for tests and ephemeral hosts.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{KeyValueStore, StoredValue, StringEntry};
use crate::StoreResult;

/// `HashMap`-backed store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_string(&self, key: String) -> String {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        StoredValue::text(values.get(&key))
    }

    fn set_string(&self, key: String, value: String) -> StoreResult<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, StoredValue::Text(value));
        Ok(())
    }

    fn get_strings(&self, keys: Vec<String>) -> Vec<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        keys.iter()
            .map(|key| StoredValue::text(values.get(key)))
            .collect()
    }

    fn set_strings(&self, entries: Vec<StringEntry>) -> StoreResult<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries {
            values.insert(entry.key, StoredValue::Text(entry.value));
        }
        drop(values);
        Ok(())
    }

    fn get_bool(&self, key: String, default_value: bool) -> bool {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        StoredValue::flag(values.get(&key), default_value)
    }

    fn set_bool(&self, key: String, value: bool) -> StoreResult<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, StoredValue::Flag(value));
        Ok(())
    }

    fn get_long(&self, key: String, default_value: i64) -> i64 {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        StoredValue::number(values.get(&key), default_value)
    }

    fn set_long(&self, key: String, value: i64) -> StoreResult<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, StoredValue::Number(value));
        Ok(())
    }
}
