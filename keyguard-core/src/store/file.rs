//! JSON-file [`KeyValueStore`] with atomic replace.
//!
//! The whole document is rewritten on every update: serialized to a sibling
//! temporary file, synced, then renamed over the original. A crash mid-write
//! leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::{KeyValueStore, StoredValue, StringEntry};
use crate::{StoreError, StoreResult};

type Document = BTreeMap<String, StoredValue>;

/// File-backed store for hosts without a platform preference store.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl FileKeyValueStore {
    /// Opens the store at `path`, creating parent directories. A missing file
    /// is an empty store.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or an existing
    /// file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| map_io_err(&err))?;
        }
        let document = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| StoreError::Serialization(err.to_string()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(err) => return Err(map_io_err(&err)),
        };
        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> StoreResult<()> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = document.clone();
        apply(&mut next);
        self.persist(&next)?;
        *document = next;
        drop(document);
        Ok(())
    }

    fn persist(&self, document: &Document) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        let tmp_path = self.path.with_extension("tmp");
        let mut file = File::create(&tmp_path).map_err(|err| map_io_err(&err))?;
        file.write_all(&bytes).map_err(|err| map_io_err(&err))?;
        file.sync_all().map_err(|err| map_io_err(&err))?;
        drop(file);
        fs::rename(&tmp_path, &self.path).map_err(|err| map_io_err(&err))
    }

    fn read<T>(&self, read: impl FnOnce(&Document) -> T) -> T {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        read(&document)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_string(&self, key: String) -> String {
        self.read(|document| StoredValue::text(document.get(&key)))
    }

    fn set_string(&self, key: String, value: String) -> StoreResult<()> {
        self.update(|document| {
            document.insert(key, StoredValue::Text(value));
        })
    }

    fn get_strings(&self, keys: Vec<String>) -> Vec<String> {
        self.read(|document| {
            keys.iter()
                .map(|key| StoredValue::text(document.get(key)))
                .collect()
        })
    }

    fn set_strings(&self, entries: Vec<StringEntry>) -> StoreResult<()> {
        self.update(|document| {
            for entry in entries {
                document.insert(entry.key, StoredValue::Text(entry.value));
            }
        })
    }

    fn get_bool(&self, key: String, default_value: bool) -> bool {
        self.read(|document| StoredValue::flag(document.get(&key), default_value))
    }

    fn set_bool(&self, key: String, value: bool) -> StoreResult<()> {
        self.update(|document| {
            document.insert(key, StoredValue::Flag(value));
        })
    }

    fn get_long(&self, key: String, default_value: i64) -> i64 {
        self.read(|document| StoredValue::number(document.get(&key), default_value))
    }

    fn set_long(&self, key: String, value: i64) -> StoreResult<()> {
        self.update(|document| {
            document.insert(key, StoredValue::Number(value));
        })
    }
}

fn map_io_err(err: &std::io::Error) -> StoreError {
    StoreError::Io(err.to_string())
}
