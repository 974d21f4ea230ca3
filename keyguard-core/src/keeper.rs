//! End-to-end encrypt and decrypt flows exported to foreign hosts.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::codec::AuthenticatedCodec;
use crate::engine::{AuthorizedEngine, CipherEngine, CipherEngineFactory};
use crate::gate::{authorize, AuthorizationGate, GateAvailability};
use crate::keystore::SecureKeystore;
use crate::store::{KeyValueStore, RecordStore, SealedRecord};
use crate::vault::SecureKeyVault;
use crate::{KeeperError, KeyguardConfig};

/// Seals and opens one secret behind the authorization gate.
///
/// Every platform capability is injected: the keystore holding the vault key,
/// the durable store holding the sealed record, and the gate prompting the
/// user. Flows run one at a time: a flow holds the keeper from engine
/// construction until its record is written or read.
#[derive(uniffi::Object)]
pub struct SecretKeeper {
    config: KeyguardConfig,
    vault: SecureKeyVault,
    factory: CipherEngineFactory,
    codec: AuthenticatedCodec,
    gate: Arc<dyn AuthorizationGate>,
    flow_lock: Mutex<()>,
}

impl std::fmt::Debug for SecretKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKeeper")
            .field("key_name", &self.config.key_name)
            .finish_non_exhaustive()
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl SecretKeeper {
    /// Creates a keeper over the host keystore, store and gate.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        config: KeyguardConfig,
        keystore: Arc<dyn SecureKeystore>,
        store: Arc<dyn KeyValueStore>,
        gate: Arc<dyn AuthorizationGate>,
    ) -> Self {
        let records = RecordStore::new(store);
        let vault = SecureKeyVault::new(keystore, records.clone());
        Self {
            config,
            factory: CipherEngineFactory::new(vault.clone()),
            vault,
            codec: AuthenticatedCodec::new(records),
            gate,
            flow_lock: Mutex::new(()),
        }
    }

    /// Prompts the user, then seals `plaintext` and persists it, replacing any
    /// previous secret.
    ///
    /// # Errors
    /// Returns [`KeeperError::GateUnavailable`] before touching the keystore
    /// if the gate cannot run, [`KeeperError::KeyInvalidated`] after purging
    /// an invalidated key, an authorization error if the prompt did not
    /// succeed (nothing is persisted), or [`KeeperError::Unknown`].
    #[allow(clippy::needless_pass_by_value)]
    pub async fn encrypt_secret(&self, plaintext: String) -> Result<SealedRecord, KeeperError> {
        self.ensure_available()?;
        let _flow = self.flow_lock.lock().await;
        let engine = self.factory.build_encrypt_engine(&self.config.key_name)?;
        let engine = self.authorize(engine).await?;
        Ok(self.codec.encrypt(&plaintext, engine)?)
    }

    /// Prompts the user, then opens the persisted secret.
    ///
    /// # Errors
    /// Returns [`KeeperError::GateUnavailable`] if the gate cannot run,
    /// [`KeeperError::MissingNonce`] or [`KeeperError::NoData`] if no secret
    /// is stored (no prompt is shown), [`KeeperError::KeyInvalidated`] after
    /// purging an invalidated key, an authorization error if the prompt did
    /// not succeed, or [`KeeperError::AuthenticationFailed`] if the record was
    /// tampered with.
    pub async fn decrypt_secret(&self) -> Result<String, KeeperError> {
        self.ensure_available()?;
        let _flow = self.flow_lock.lock().await;
        let stored_nonce = self.vault.records().nonce();
        if stored_nonce.trim().is_empty() {
            return Err(KeeperError::MissingNonce);
        }
        if !self.has_secret() {
            return Err(KeeperError::NoData);
        }
        let engine = self
            .factory
            .build_decrypt_engine(&self.config.key_name, &stored_nonce)?;
        let engine = self.authorize(engine).await?;
        Ok(self.codec.decrypt(engine)?)
    }

    /// Returns `true` when a complete sealed record is persisted.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        self.vault.records().load().is_some()
    }

    /// Returns the persisted record, if complete.
    #[must_use]
    pub fn stored_record(&self) -> Option<SealedRecord> {
        self.vault.records().load()
    }

    /// Returns `true` if the vault key was invalidated and purged since the
    /// last successful seal.
    #[must_use]
    pub fn key_was_invalidated(&self) -> bool {
        self.vault.records().key_invalidated()
    }

    /// Deletes the vault key and the sealed record.
    ///
    /// # Errors
    /// Returns [`KeeperError::KeyAccess`] if the key or the record could not
    /// be removed.
    pub fn reset(&self) -> Result<(), KeeperError> {
        log::info!("resetting vault key {}", self.config.key_name);
        self.vault.invalidate_and_delete(&self.config.key_name)?;
        self.vault
            .records()
            .set_key_invalidated(false)
            .map_err(|err| KeeperError::Unknown(err.to_string()))
    }
}

impl SecretKeeper {
    /// The configuration the keeper was created with.
    #[must_use]
    pub const fn config(&self) -> &KeyguardConfig {
        &self.config
    }

    fn ensure_available(&self) -> Result<(), KeeperError> {
        match self.gate.availability() {
            GateAvailability::Available => Ok(()),
            other => {
                log::warn!("authorization gate unavailable: {other:?}");
                Err(KeeperError::GateUnavailable(format!("{other:?}")))
            }
        }
    }

    async fn authorize(&self, engine: CipherEngine) -> Result<AuthorizedEngine, KeeperError> {
        Ok(authorize(self.gate.as_ref(), &self.config.prompt, engine).await?)
    }
}
