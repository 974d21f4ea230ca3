//! Durable key-value store boundary and the sealed record kept in it.
//!
//! The host persists two strings, the base64 nonce and the base64 ciphertext,
//! in whatever preference store the platform offers:
//!
//! - Android: `SharedPreferences` (one `Editor` + `apply()` per batch)
//! - iOS: `UserDefaults`
//! - Desktop and tests: [`FileKeyValueStore`] or [`MemoryKeyValueStore`]
//!
//! Accessors are typed and fixed; there is no generic "any value" setter.

mod file;
mod memory;
mod record;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use record::{RecordStore, SealedRecord};
pub(crate) use record::decode_field;

use serde::{Deserialize, Serialize};

use crate::StoreResult;

/// One key/value pair of an atomic string batch.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StringEntry {
    /// Store key.
    pub key: String,
    /// Value to write. An empty string clears the field.
    pub value: String,
}

impl StringEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// Durable string-keyed store that survives process restarts.
///
/// Reads never fail: an absent key reads as the empty string (or the supplied
/// default for booleans).
///
/// # Atomicity
///
/// [`set_strings`](Self::set_strings) MUST publish every entry of the batch
/// at once and [`get_strings`](Self::get_strings) MUST return a consistent
/// snapshot. A reader may never observe half of a batch.
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    /// Returns the text stored under `key`, or an empty string.
    fn get_string(&self, key: String) -> String;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn set_string(&self, key: String, value: String) -> StoreResult<()>;

    /// Returns the values of `keys`, in order, from a single snapshot.
    fn get_strings(&self, keys: Vec<String>) -> Vec<String>;

    /// Stores every entry as one atomic update.
    ///
    /// # Errors
    /// Returns an error if the batch cannot be persisted; in that case none
    /// of the entries are visible.
    fn set_strings(&self, entries: Vec<StringEntry>) -> StoreResult<()>;

    /// Returns the flag stored under `key`, or `default_value`.
    fn get_bool(&self, key: String, default_value: bool) -> bool;

    /// Stores a flag under `key`.
    ///
    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn set_bool(&self, key: String, value: bool) -> StoreResult<()>;

    /// Returns the integer stored under `key`, or `default_value`.
    fn get_long(&self, key: String, default_value: i64) -> i64;

    /// Stores an integer under `key`.
    ///
    /// # Errors
    /// Returns an error if the value cannot be persisted.
    fn set_long(&self, key: String, value: i64) -> StoreResult<()>;
}

/// Value held by the reference stores. Typed getters ignore values of the
/// other type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Flag(bool),
    Number(i64),
}

impl StoredValue {
    fn text(value: Option<&Self>) -> String {
        match value {
            Some(Self::Text(text)) => text.clone(),
            _ => String::new(),
        }
    }

    fn flag(value: Option<&Self>, default_value: bool) -> bool {
        match value {
            Some(Self::Flag(flag)) => *flag,
            _ => default_value,
        }
    }

    fn number(value: Option<&Self>, default_value: i64) -> i64 {
        match value {
            Some(Self::Number(number)) => *number,
            _ => default_value,
        }
    }
}
