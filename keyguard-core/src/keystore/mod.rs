//! Protected keystore boundary.
//!
//! The keystore owns the key material. The core only ever names keys by alias
//! and asks the keystore to begin single-use operations with them; raw key
//! bytes never cross this boundary.
//!
//! # Platform Implementations
//!
//! - Android: `AndroidKeyStore` + `KeyGenerator` with
//!   `setUserAuthenticationRequired(true)`; operations wrap an initialized
//!   `javax.crypto.Cipher`, whose `KeyPermanentlyInvalidatedException` maps to
//!   [`KeystoreError::KeyPermanentlyInvalidated`].
//! - iOS: Secure Enclave wrapped key with a biometry-bound access control.
//! - Tests and desktop: [`SoftwareKeystore`].
//!
//! [`KeystoreError::KeyPermanentlyInvalidated`]: crate::KeystoreError::KeyPermanentlyInvalidated

mod software;

pub use software::SoftwareKeystore;

use std::sync::Arc;

use crate::defaults::{
    BLOCK_MODE, ENCRYPTION_PADDING, GCM_TAG_LENGTH_BITS, KEY_ALGORITHM, KEY_SIZE_BITS,
};
use crate::{EngineMode, KeystoreResult};

/// Parameters for generating the vault key inside the keystore.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeyGenParameters {
    /// Key algorithm, `AES`.
    pub algorithm: String,
    /// Key size in bits.
    pub key_size_bits: u32,
    /// Allowed block mode, `GCM`.
    pub block_mode: String,
    /// Allowed padding, `NoPadding`.
    pub padding: String,
    /// Operations the key may be used for.
    pub purposes: Vec<EngineMode>,
    /// Whether every use must be authorized by the user.
    pub user_authentication_required: bool,
}

impl KeyGenParameters {
    /// Parameters of the vault key: AES-256, GCM, no padding, encrypt and
    /// decrypt, user authentication required.
    #[must_use]
    pub fn vault_key() -> Self {
        Self {
            algorithm: KEY_ALGORITHM.to_string(),
            key_size_bits: KEY_SIZE_BITS,
            block_mode: BLOCK_MODE.to_string(),
            padding: ENCRYPTION_PADDING.to_string(),
            purposes: vec![EngineMode::Encrypt, EngineMode::Decrypt],
            user_authentication_required: true,
        }
    }
}

/// GCM parameters supplied when beginning a decrypt operation.
#[derive(Clone, PartialEq, Eq, uniffi::Record)]
pub struct GcmParameters {
    /// Authentication tag length in bits.
    pub tag_length_bits: u32,
    /// Nonce the ciphertext was sealed with.
    pub nonce: Vec<u8>,
}

impl GcmParameters {
    /// Parameters with the standard 128-bit tag.
    #[must_use]
    pub const fn with_nonce(nonce: Vec<u8>) -> Self {
        Self {
            tag_length_bits: GCM_TAG_LENGTH_BITS,
            nonce,
        }
    }
}

impl std::fmt::Debug for GcmParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcmParameters")
            .field("tag_length_bits", &self.tag_length_bits)
            .field("nonce_len", &self.nonce.len())
            .finish()
    }
}

/// Named protected key storage.
///
/// Must be loaded before each access; implementations must not assume state
/// survives between calls because the platform can invalidate keys at any
/// time.
#[uniffi::export(with_foreign)]
pub trait SecureKeystore: Send + Sync {
    /// Opens (loads) the keystore. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the keystore cannot be reached.
    fn load(&self) -> KeystoreResult<()>;

    /// Returns whether a key exists under `alias`.
    ///
    /// # Errors
    /// Returns an error if the lookup fails.
    fn contains_alias(&self, alias: String) -> KeystoreResult<bool>;

    /// Generates and stores a new key under `alias`.
    ///
    /// # Errors
    /// Returns [`KeystoreError::InvalidParameters`](crate::KeystoreError::InvalidParameters)
    /// if the parameters are rejected.
    fn generate_key(&self, alias: String, parameters: KeyGenParameters) -> KeystoreResult<()>;

    /// Deletes the key under `alias`. Deleting an absent key succeeds.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be removed.
    fn delete_entry(&self, alias: String) -> KeystoreResult<()>;

    /// Initializes a single-use operation with the key under `alias`.
    ///
    /// Encrypt operations take no GCM parameters; the keystore generates a
    /// fresh nonce. Decrypt operations require them.
    ///
    /// # Errors
    /// Returns [`KeystoreError::KeyPermanentlyInvalidated`](crate::KeystoreError::KeyPermanentlyInvalidated)
    /// if the key was invalidated by an enrollment change, or another error
    /// if the key is missing or the parameters are rejected.
    fn begin_operation(
        &self,
        alias: String,
        transformation: String,
        mode: EngineMode,
        gcm_parameters: Option<GcmParameters>,
    ) -> KeystoreResult<Arc<dyn KeystoreOperation>>;
}

/// An initialized, single-use keystore operation.
///
/// The authorization gate authenticates the user against this exact object;
/// the keystore refuses to [`finish`](Self::finish) it otherwise.
#[uniffi::export(with_foreign)]
pub trait KeystoreOperation: Send + Sync {
    /// Mode the operation was initialized in.
    fn mode(&self) -> EngineMode;

    /// Nonce of the operation: generated for encryption, supplied for
    /// decryption.
    fn nonce(&self) -> Vec<u8>;

    /// Platform handle the authentication event is bound to.
    fn operation_handle(&self) -> u64;

    /// Runs the whole input through the operation in one shot.
    ///
    /// Encryption returns ciphertext with the tag appended; decryption
    /// verifies and strips it.
    ///
    /// # Errors
    /// Returns [`KeystoreError::AuthenticationTagMismatch`](crate::KeystoreError::AuthenticationTagMismatch)
    /// if decryption fails verification,
    /// [`KeystoreError::UserNotAuthenticated`](crate::KeystoreError::UserNotAuthenticated)
    /// if the operation was not authorized, or
    /// [`KeystoreError::OperationConsumed`](crate::KeystoreError::OperationConsumed)
    /// on reuse.
    fn finish(&self, input: Vec<u8>) -> KeystoreResult<Vec<u8>>;
}

/// A keystore that has been loaded for the duration of one vault call.
///
/// Obtained only through [`LoadedKeystore::open`], so every access is
/// preceded by a load.
pub struct LoadedKeystore<'a> {
    keystore: &'a dyn SecureKeystore,
}

impl<'a> LoadedKeystore<'a> {
    /// Loads `keystore` and scopes access to the returned guard.
    ///
    /// # Errors
    /// Returns the keystore's load error.
    pub fn open(keystore: &'a dyn SecureKeystore) -> KeystoreResult<Self> {
        keystore.load()?;
        Ok(Self { keystore })
    }

    /// See [`SecureKeystore::contains_alias`].
    ///
    /// # Errors
    /// Returns the keystore's lookup error.
    pub fn contains_alias(&self, alias: &str) -> KeystoreResult<bool> {
        self.keystore.contains_alias(alias.to_string())
    }

    /// See [`SecureKeystore::generate_key`].
    ///
    /// # Errors
    /// Returns the keystore's generation error.
    pub fn generate_key(&self, alias: &str, parameters: KeyGenParameters) -> KeystoreResult<()> {
        self.keystore.generate_key(alias.to_string(), parameters)
    }

    /// See [`SecureKeystore::delete_entry`].
    ///
    /// # Errors
    /// Returns the keystore's delete error.
    pub fn delete_entry(&self, alias: &str) -> KeystoreResult<()> {
        self.keystore.delete_entry(alias.to_string())
    }

    /// See [`SecureKeystore::begin_operation`].
    ///
    /// # Errors
    /// Returns the keystore's initialization error.
    pub fn begin_operation(
        &self,
        alias: &str,
        transformation: &str,
        mode: EngineMode,
        gcm_parameters: Option<GcmParameters>,
    ) -> KeystoreResult<Arc<dyn KeystoreOperation>> {
        self.keystore.begin_operation(
            alias.to_string(),
            transformation.to_string(),
            mode,
            gcm_parameters,
        )
    }
}
