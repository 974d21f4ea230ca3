//! Single-use cipher engines bound to the vault key.
//!
//! A [`CipherEngine`] wraps one initialized keystore operation. It is not
//! `Clone` and every consuming call takes it by value, so an engine is used
//! for at most one transform. Only the gate can turn it into an
//! [`AuthorizedEngine`], the one type the codec accepts.

use std::sync::Arc;

use crate::defaults::TRANSFORMATION;
use crate::keystore::{GcmParameters, KeystoreOperation};
use crate::store::decode_field;
use crate::vault::{SecureKeyVault, VaultKey};
use crate::{EngineError, KeystoreError, KeystoreResult};

/// Direction of a cipher engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EngineMode {
    /// Seal plaintext; the keystore generates the nonce.
    Encrypt,
    /// Open ciphertext with a stored nonce.
    Decrypt,
}

/// Initialized, not yet authorized, single-use engine.
pub struct CipherEngine {
    key: VaultKey,
    mode: EngineMode,
    operation: Arc<dyn KeystoreOperation>,
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("operation_handle", &self.operation.operation_handle())
            .finish()
    }
}

impl CipherEngine {
    /// Key the engine is bound to.
    #[must_use]
    pub const fn key(&self) -> &VaultKey {
        &self.key
    }

    /// Mode the engine was initialized in.
    #[must_use]
    pub const fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Nonce of the underlying operation.
    #[must_use]
    pub fn nonce(&self) -> Vec<u8> {
        self.operation.nonce()
    }

    /// The keystore operation the authorization gate authenticates against.
    #[must_use]
    pub fn operation(&self) -> Arc<dyn KeystoreOperation> {
        Arc::clone(&self.operation)
    }
}

/// A [`CipherEngine`] whose operation was authorized by the gate.
#[derive(Debug)]
pub struct AuthorizedEngine {
    engine: CipherEngine,
}

impl AuthorizedEngine {
    pub(crate) const fn new(engine: CipherEngine) -> Self {
        Self { engine }
    }

    /// Mode of the wrapped engine.
    #[must_use]
    pub const fn mode(&self) -> EngineMode {
        self.engine.mode
    }

    /// Nonce of the wrapped engine.
    #[must_use]
    pub fn nonce(&self) -> Vec<u8> {
        self.engine.nonce()
    }

    /// Key of the wrapped engine.
    #[must_use]
    pub const fn key(&self) -> &VaultKey {
        &self.engine.key
    }

    /// Runs `input` through the engine once, consuming it.
    pub(crate) fn finish(self, input: Vec<u8>) -> KeystoreResult<Vec<u8>> {
        self.engine.operation.finish(input)
    }
}

/// Builds engines for the vault key, recovering from key invalidation.
#[derive(Debug, Clone)]
pub struct CipherEngineFactory {
    vault: SecureKeyVault,
}

impl CipherEngineFactory {
    /// Creates a factory over `vault`.
    #[must_use]
    pub const fn new(vault: SecureKeyVault) -> Self {
        Self { vault }
    }

    /// Builds an engine for `mode`. Decrypt engines read the nonce from the
    /// vault's record store.
    ///
    /// # Errors
    /// See [`build_encrypt_engine`](Self::build_encrypt_engine) and
    /// [`build_decrypt_engine`](Self::build_decrypt_engine).
    pub fn build_engine(&self, name: &str, mode: EngineMode) -> Result<CipherEngine, EngineError> {
        match mode {
            EngineMode::Encrypt => self.build_encrypt_engine(name),
            EngineMode::Decrypt => {
                let stored_nonce = self.vault.records().nonce();
                self.build_decrypt_engine(name, &stored_nonce)
            }
        }
    }

    /// Builds an encrypt engine; the keystore generates a fresh nonce.
    ///
    /// # Errors
    /// Returns [`EngineError::KeyInvalidated`] after purging an invalidated
    /// key, or [`EngineError::Unknown`] for any other failure.
    pub fn build_encrypt_engine(&self, name: &str) -> Result<CipherEngine, EngineError> {
        self.begin(name, EngineMode::Encrypt, None)
    }

    /// Builds a decrypt engine for the base64 nonce `stored_nonce_base64`.
    ///
    /// # Errors
    /// Returns [`EngineError::MissingNonce`] if the nonce is blank or decodes
    /// to nothing, [`EngineError::KeyInvalidated`] after purging an
    /// invalidated key, or [`EngineError::Unknown`] for any other failure.
    pub fn build_decrypt_engine(
        &self,
        name: &str,
        stored_nonce_base64: &str,
    ) -> Result<CipherEngine, EngineError> {
        if stored_nonce_base64.trim().is_empty() {
            return Err(EngineError::MissingNonce);
        }
        let nonce = decode_field(stored_nonce_base64)
            .map_err(|err| EngineError::Unknown(format!("malformed nonce: {err}")))?;
        if nonce.is_empty() {
            return Err(EngineError::MissingNonce);
        }
        self.begin(
            name,
            EngineMode::Decrypt,
            Some(GcmParameters::with_nonce(nonce)),
        )
    }

    fn begin(
        &self,
        name: &str,
        mode: EngineMode,
        gcm_parameters: Option<GcmParameters>,
    ) -> Result<CipherEngine, EngineError> {
        let key = self
            .vault
            .get_or_create_key(name)
            .map_err(|err| EngineError::Unknown(err.to_string()))?;
        let keystore = self
            .vault
            .open()
            .map_err(|err| EngineError::Unknown(err.to_string()))?;

        match keystore.begin_operation(key.alias(), TRANSFORMATION, mode, gcm_parameters) {
            Ok(operation) if operation.mode() == mode => {
                log::debug!("initialized {mode} engine for {name}");
                Ok(CipherEngine {
                    key,
                    mode,
                    operation,
                })
            }
            Ok(operation) => Err(EngineError::Unknown(format!(
                "keystore returned a {} operation for {mode}",
                operation.mode()
            ))),
            Err(KeystoreError::KeyPermanentlyInvalidated(_)) => {
                drop(keystore);
                Err(self.recover_invalidated_key(name))
            }
            Err(err) => Err(EngineError::Unknown(err.to_string())),
        }
    }

    /// Purges an invalidated key and the record sealed with it. Cleanup
    /// failures are logged, never returned.
    fn recover_invalidated_key(&self, name: &str) -> EngineError {
        log::warn!("vault key {name} permanently invalidated, purging key and sealed record");
        if let Err(err) = self.vault.invalidate_and_delete(name) {
            log::error!("purge of invalidated key {name} incomplete: {err}");
        }
        if let Err(err) = self.vault.records().set_key_invalidated(true) {
            log::error!("failed to record key invalidation: {err}");
        }
        EngineError::KeyInvalidated
    }
}
