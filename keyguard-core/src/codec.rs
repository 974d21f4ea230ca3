//! Seals and opens the secret with an authorized engine.

use crate::engine::{AuthorizedEngine, EngineMode};
use crate::store::{decode_field, RecordStore, SealedRecord};
use crate::{CodecError, KeystoreError};

/// Authenticated encryption of the single secret, persisted as a
/// [`SealedRecord`].
#[derive(Debug, Clone)]
pub struct AuthenticatedCodec {
    records: RecordStore,
}

impl AuthenticatedCodec {
    /// Creates a codec persisting into `records`.
    #[must_use]
    pub const fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Seals `plaintext` (UTF-8) in one shot and persists the record,
    /// replacing any previous one.
    ///
    /// If the engine produced an empty nonce or ciphertext nothing is
    /// persisted and the unsaved record is returned.
    ///
    /// # Errors
    /// Returns [`CodecError::Unknown`] if the engine is not an encrypt engine,
    /// the transform fails, or the record cannot be written. A failure to
    /// clear the invalidation flag after the record is written is only
    /// logged.
    pub fn encrypt(
        &self,
        plaintext: &str,
        engine: AuthorizedEngine,
    ) -> Result<SealedRecord, CodecError> {
        if engine.mode() != EngineMode::Encrypt {
            return Err(CodecError::Unknown(format!(
                "encrypt requires an encrypt engine, got {}",
                engine.mode()
            )));
        }

        let nonce = engine.nonce();
        let ciphertext = engine
            .finish(plaintext.as_bytes().to_vec())
            .map_err(|err| CodecError::Unknown(err.to_string()))?;
        let record = SealedRecord::from_parts(&nonce, &ciphertext);

        if nonce.is_empty() || ciphertext.is_empty() {
            log::warn!("engine produced an empty nonce or ciphertext, record not persisted");
            return Ok(record);
        }
        self.records
            .save(&record)
            .map_err(|err| CodecError::Unknown(err.to_string()))?;
        if let Err(err) = self.records.set_key_invalidated(false) {
            log::error!("sealed secret persisted but invalidation flag not cleared: {err}");
        }
        log::info!("sealed secret ({} ciphertext bytes)", ciphertext.len());
        Ok(record)
    }

    /// Opens the persisted record in one shot and returns the UTF-8
    /// plaintext.
    ///
    /// # Errors
    /// Returns [`CodecError::NoData`] if no complete record is stored (no
    /// transform is attempted), [`CodecError::AuthenticationFailed`] if the
    /// ciphertext fails GCM verification, or [`CodecError::Unknown`] for any
    /// other failure, including a record whose nonce is not the engine's.
    pub fn decrypt(&self, engine: AuthorizedEngine) -> Result<String, CodecError> {
        if engine.mode() != EngineMode::Decrypt {
            return Err(CodecError::Unknown(format!(
                "decrypt requires a decrypt engine, got {}",
                engine.mode()
            )));
        }

        let record = self.records.load().ok_or(CodecError::NoData)?;
        let nonce = decode_field(&record.nonce)
            .map_err(|err| CodecError::Unknown(format!("malformed nonce: {err}")))?;
        if nonce != engine.nonce() {
            return Err(CodecError::Unknown(
                "record changed since engine was built".to_string(),
            ));
        }
        let ciphertext = decode_field(&record.ciphertext)
            .map_err(|err| CodecError::Unknown(format!("malformed ciphertext: {err}")))?;
        let plaintext = engine.finish(ciphertext).map_err(|err| match err {
            KeystoreError::AuthenticationTagMismatch => CodecError::AuthenticationFailed,
            other => CodecError::Unknown(other.to_string()),
        })?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| CodecError::Unknown("plaintext is not valid UTF-8".to_string()))?;
        log::info!("opened sealed secret");
        Ok(plaintext)
    }
}
