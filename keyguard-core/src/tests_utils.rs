//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::store::{KeyValueStore, MemoryKeyValueStore, StringEntry};
use crate::{StoreError, StoreResult};

/// In-memory store whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyKeyValueStore {
    inner: MemoryKeyValueStore,
    fail_string_writes: AtomicBool,
    fail_bool_writes: AtomicBool,
}

impl FlakyKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_string_writes(&self, fail: bool) {
        self.fail_string_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_bool_writes(&self, fail: bool) {
        self.fail_bool_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyKeyValueStore {
    fn get_string(&self, key: String) -> String {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: String, value: String) -> StoreResult<()> {
        Self::check(&self.fail_string_writes)?;
        self.inner.set_string(key, value)
    }

    fn get_strings(&self, keys: Vec<String>) -> Vec<String> {
        self.inner.get_strings(keys)
    }

    fn set_strings(&self, entries: Vec<StringEntry>) -> StoreResult<()> {
        Self::check(&self.fail_string_writes)?;
        self.inner.set_strings(entries)
    }

    fn get_bool(&self, key: String, default_value: bool) -> bool {
        self.inner.get_bool(key, default_value)
    }

    fn set_bool(&self, key: String, value: bool) -> StoreResult<()> {
        Self::check(&self.fail_bool_writes)?;
        self.inner.set_bool(key, value)
    }

    fn get_long(&self, key: String, default_value: i64) -> i64 {
        self.inner.get_long(key, default_value)
    }

    fn set_long(&self, key: String, value: i64) -> StoreResult<()> {
        self.inner.set_long(key, value)
    }
}
