//! Lifecycle of the single named vault key.

use std::sync::Arc;

use crate::keystore::{KeyGenParameters, LoadedKeystore, SecureKeystore};
use crate::store::RecordStore;
use crate::{KeyAccessError, KeystoreError};

/// Handle to a key inside the keystore. Carries only the alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultKey {
    alias: String,
}

impl VaultKey {
    /// Alias of the key inside the keystore.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// Owns the vault key and its purge path.
#[derive(Clone)]
pub struct SecureKeyVault {
    keystore: Arc<dyn SecureKeystore>,
    records: RecordStore,
}

impl std::fmt::Debug for SecureKeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKeyVault").finish_non_exhaustive()
    }
}

impl SecureKeyVault {
    /// Creates a vault over the host keystore and record store.
    #[must_use]
    pub const fn new(keystore: Arc<dyn SecureKeystore>, records: RecordStore) -> Self {
        Self { keystore, records }
    }

    /// Returns the key under `name`, generating it on first use.
    ///
    /// An existing key is returned as is. A new key is AES-256/GCM/NoPadding
    /// and requires user authentication for every use.
    ///
    /// # Errors
    /// Returns [`KeyAccessError::Unavailable`] if the keystore cannot be
    /// loaded, [`KeyAccessError::GenerationRejected`] if the keystore refuses
    /// the key parameters, or [`KeyAccessError::Unknown`] otherwise.
    pub fn get_or_create_key(&self, name: &str) -> Result<VaultKey, KeyAccessError> {
        let keystore = self.open()?;
        if keystore.contains_alias(name).map_err(map_access_err)? {
            log::debug!("vault key {name} found");
        } else {
            keystore
                .generate_key(name, KeyGenParameters::vault_key())
                .map_err(|err| match err {
                    KeystoreError::InvalidParameters(reason) => {
                        KeyAccessError::GenerationRejected(reason)
                    }
                    other => map_access_err(other),
                })?;
            log::info!("generated vault key {name}");
        }
        Ok(VaultKey {
            alias: name.to_string(),
        })
    }

    /// Deletes the key under `name` and clears the sealed record.
    ///
    /// Used once the key was permanently invalidated by an enrollment change.
    /// The record is cleared even if the key cannot be deleted; the first
    /// failure is returned.
    ///
    /// # Errors
    /// Returns the keystore or store failure.
    pub fn invalidate_and_delete(&self, name: &str) -> Result<(), KeyAccessError> {
        let deleted = self
            .open()
            .and_then(|keystore| keystore.delete_entry(name).map_err(map_access_err));
        if let Err(err) = &deleted {
            log::warn!("failed to delete vault key {name}: {err}");
        }

        let cleared = self
            .records
            .clear()
            .map_err(|err| KeyAccessError::Unknown(format!("failed to clear record: {err}")));
        if let Err(err) = &cleared {
            log::warn!("{err}");
        }

        deleted.and(cleared)
    }

    /// Loads the keystore for one call.
    ///
    /// # Errors
    /// Returns [`KeyAccessError::Unavailable`] if the load fails.
    pub fn open(&self) -> Result<LoadedKeystore<'_>, KeyAccessError> {
        LoadedKeystore::open(self.keystore.as_ref())
            .map_err(|err| KeyAccessError::Unavailable(err.to_string()))
    }

    /// The record store the vault clears on purge.
    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }
}

fn map_access_err(err: KeystoreError) -> KeyAccessError {
    match err {
        KeystoreError::Unavailable(reason) => KeyAccessError::Unavailable(reason),
        other => KeyAccessError::Unknown(other.to_string()),
    }
}
