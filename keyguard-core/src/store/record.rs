//! The persisted `(nonce, ciphertext)` pair.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{KeyValueStore, StringEntry};
use crate::defaults::{PREF_BASE64_ENCRYPTION_IV, PREF_BASE64_SECRET_TEXT_CIPHER};
use crate::StoreResult;

/// Store key of the flag raised when an invalidated key was purged.
const PREF_KEY_INVALIDATED: &str = "key_invalidated";

/// One encrypted secret as persisted: standard base64 nonce and ciphertext
/// (ciphertext includes the GCM tag).
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SealedRecord {
    /// Base64 of the 12-byte nonce.
    pub nonce: String,
    /// Base64 of the ciphertext followed by the 16-byte tag.
    pub ciphertext: String,
}

impl SealedRecord {
    /// Encodes raw nonce and ciphertext bytes.
    #[must_use]
    pub fn from_parts(nonce: &[u8], ciphertext: &[u8]) -> Self {
        Self {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        }
    }

    /// Returns `true` when both fields hold data. Only complete records are
    /// ever decrypted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.nonce.trim().is_empty() && !self.ciphertext.trim().is_empty()
    }
}

/// Decodes one base64 record field. Line breaks and other ASCII whitespace
/// are ignored, so values written by MIME-style encoders still decode.
pub(crate) fn decode_field(field: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = field
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}

/// Typed view of the sealed record inside a [`KeyValueStore`].
#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Wraps the host store.
    #[must_use]
    pub const fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads both fields from one snapshot. Partial state reads as `None`.
    #[must_use]
    pub fn load(&self) -> Option<SealedRecord> {
        let record = self.snapshot();
        record.is_complete().then_some(record)
    }

    /// Returns the stored base64 nonce, or an empty string.
    #[must_use]
    pub fn nonce(&self) -> String {
        self.store.get_string(PREF_BASE64_ENCRYPTION_IV.to_string())
    }

    /// Returns the stored base64 ciphertext, or an empty string.
    #[must_use]
    pub fn ciphertext(&self) -> String {
        self.store
            .get_string(PREF_BASE64_SECRET_TEXT_CIPHER.to_string())
    }

    /// Overwrites both fields in one atomic write.
    ///
    /// # Errors
    /// Returns an error if the host store rejects the write.
    pub fn save(&self, record: &SealedRecord) -> StoreResult<()> {
        self.store.set_strings(vec![
            StringEntry::new(PREF_BASE64_ENCRYPTION_IV, record.nonce.clone()),
            StringEntry::new(PREF_BASE64_SECRET_TEXT_CIPHER, record.ciphertext.clone()),
        ])
    }

    /// Empties both fields in one atomic write.
    ///
    /// # Errors
    /// Returns an error if the host store rejects the write.
    pub fn clear(&self) -> StoreResult<()> {
        self.save(&SealedRecord {
            nonce: String::new(),
            ciphertext: String::new(),
        })
    }

    /// Returns whether an invalidated key was purged since the last
    /// successful seal.
    #[must_use]
    pub fn key_invalidated(&self) -> bool {
        self.store.get_bool(PREF_KEY_INVALIDATED.to_string(), false)
    }

    /// Records whether an invalidated key was purged.
    ///
    /// # Errors
    /// Returns an error if the host store rejects the write.
    pub fn set_key_invalidated(&self, invalidated: bool) -> StoreResult<()> {
        self.store
            .set_bool(PREF_KEY_INVALIDATED.to_string(), invalidated)
    }

    fn snapshot(&self) -> SealedRecord {
        let mut values = self
            .store
            .get_strings(vec![
                PREF_BASE64_ENCRYPTION_IV.to_string(),
                PREF_BASE64_SECRET_TEXT_CIPHER.to_string(),
            ])
            .into_iter();
        SealedRecord {
            nonce: values.next().unwrap_or_default(),
            ciphertext: values.next().unwrap_or_default(),
        }
    }
}
