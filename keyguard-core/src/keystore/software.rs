//! In-process AES-256-GCM keystore.
//!
//! Behaves like a hardware keystore from the core's point of view: key bytes
//! stay inside, operations are single-use, keys that require authentication
//! refuse to finish until their operation handle is approved, and an
//! enrollment change permanently invalidates existing keys.
//!
//! Key material lives only in process memory and is zeroized on drop. Use it
//! for tests and for hosts without a platform keystore.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroizing;

use super::{GcmParameters, KeyGenParameters, KeystoreOperation, SecureKeystore};
use crate::defaults::{
    BLOCK_MODE, ENCRYPTION_PADDING, GCM_TAG_LENGTH_BITS, KEY_ALGORITHM, KEY_SIZE_BITS,
    NONCE_LENGTH, TRANSFORMATION,
};
use crate::{EngineMode, KeystoreError, KeystoreResult};

struct SoftwareKey {
    material: SecretBox<[u8; 32]>,
    enrollment_epoch: u64,
    user_authentication_required: bool,
}

#[derive(Default)]
struct KeystoreState {
    keys: HashMap<String, SoftwareKey>,
    enrollment_epoch: u64,
}

/// Operation handles approved by an authorization event, shared with the
/// operations so they can check (and consume) their approval.
type Approvals = Arc<Mutex<HashSet<u64>>>;

/// Software keystore with simulated authorization binding.
#[derive(Default)]
pub struct SoftwareKeystore {
    state: Mutex<KeystoreState>,
    approvals: Approvals,
    next_handle: AtomicU64,
    loads: AtomicUsize,
    unavailable: AtomicBool,
}

impl std::fmt::Debug for SoftwareKeystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareKeystore")
            .field("keys", &self.key_count())
            .field("loads", &self.load_count())
            .finish_non_exhaustive()
    }
}

impl SoftwareKeystore {
    /// Creates an empty keystore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful authorization for the operation `handle`.
    ///
    /// The approval is consumed by the next `finish` of that operation.
    pub fn approve(&self, handle: u64) {
        lock(&self.approvals).insert(handle);
    }

    /// Simulates a biometric enrollment change: every existing key that
    /// requires user authentication becomes permanently invalidated.
    pub fn change_enrollment(&self) {
        self.state().enrollment_epoch += 1;
    }

    /// Makes [`SecureKeystore::load`] fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of times the keystore was loaded.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.state().keys.len()
    }

    fn state(&self) -> MutexGuard<'_, KeystoreState> {
        lock(&self.state)
    }

    fn validate(parameters: &KeyGenParameters) -> KeystoreResult<()> {
        if parameters.algorithm != KEY_ALGORITHM
            || parameters.key_size_bits != KEY_SIZE_BITS
            || parameters.block_mode != BLOCK_MODE
            || parameters.padding != ENCRYPTION_PADDING
        {
            return Err(KeystoreError::InvalidParameters(format!(
                "unsupported key: {}-{} {}/{}",
                parameters.algorithm,
                parameters.key_size_bits,
                parameters.block_mode,
                parameters.padding
            )));
        }
        if parameters.purposes.is_empty() {
            return Err(KeystoreError::InvalidParameters(
                "key must have at least one purpose".to_string(),
            ));
        }
        Ok(())
    }

    fn operation_nonce(
        mode: EngineMode,
        gcm_parameters: Option<GcmParameters>,
    ) -> KeystoreResult<[u8; NONCE_LENGTH]> {
        let mut nonce = [0u8; NONCE_LENGTH];
        match (mode, gcm_parameters) {
            (EngineMode::Encrypt, None) => OsRng.fill_bytes(&mut nonce),
            (EngineMode::Encrypt, Some(_)) => {
                return Err(KeystoreError::InvalidParameters(
                    "caller-provided nonce not permitted for encryption".to_string(),
                ))
            }
            (EngineMode::Decrypt, None) => {
                return Err(KeystoreError::InvalidParameters(
                    "decryption requires GCM parameters".to_string(),
                ))
            }
            (EngineMode::Decrypt, Some(parameters)) => {
                if parameters.tag_length_bits != GCM_TAG_LENGTH_BITS {
                    return Err(KeystoreError::InvalidParameters(format!(
                        "unsupported tag length: {}",
                        parameters.tag_length_bits
                    )));
                }
                if parameters.nonce.len() != NONCE_LENGTH {
                    return Err(KeystoreError::InvalidParameters(format!(
                        "nonce must be {NONCE_LENGTH} bytes, got {}",
                        parameters.nonce.len()
                    )));
                }
                nonce.copy_from_slice(&parameters.nonce);
            }
        }
        Ok(nonce)
    }
}

impl SecureKeystore for SoftwareKeystore {
    fn load(&self) -> KeystoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KeystoreError::Unavailable(
                "software keystore disabled".to_string(),
            ));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn contains_alias(&self, alias: String) -> KeystoreResult<bool> {
        Ok(self.state().keys.contains_key(&alias))
    }

    fn generate_key(&self, alias: String, parameters: KeyGenParameters) -> KeystoreResult<()> {
        Self::validate(&parameters)?;
        let mut material = Box::new([0u8; 32]);
        OsRng.fill_bytes(&mut material[..]);

        let mut state = self.state();
        let key = SoftwareKey {
            material: SecretBox::new(material),
            enrollment_epoch: state.enrollment_epoch,
            user_authentication_required: parameters.user_authentication_required,
        };
        state.keys.insert(alias, key);
        drop(state);
        Ok(())
    }

    fn delete_entry(&self, alias: String) -> KeystoreResult<()> {
        self.state().keys.remove(&alias);
        Ok(())
    }

    fn begin_operation(
        &self,
        alias: String,
        transformation: String,
        mode: EngineMode,
        gcm_parameters: Option<GcmParameters>,
    ) -> KeystoreResult<Arc<dyn KeystoreOperation>> {
        if transformation != TRANSFORMATION {
            return Err(KeystoreError::InvalidParameters(format!(
                "unsupported transformation: {transformation}"
            )));
        }

        let state = self.state();
        let key = state
            .keys
            .get(&alias)
            .ok_or_else(|| KeystoreError::KeyNotFound(alias.clone()))?;
        if key.user_authentication_required && key.enrollment_epoch != state.enrollment_epoch {
            return Err(KeystoreError::KeyPermanentlyInvalidated(alias));
        }
        let material = Zeroizing::new(*key.material.expose_secret());
        let user_authentication_required = key.user_authentication_required;
        drop(state);

        let nonce = Self::operation_nonce(mode, gcm_parameters)?;
        Ok(Arc::new(SoftwareOperation {
            handle: self.next_handle.fetch_add(1, Ordering::SeqCst) + 1,
            mode,
            nonce,
            material,
            user_authentication_required,
            approvals: Arc::clone(&self.approvals),
            consumed: AtomicBool::new(false),
        }))
    }
}

struct SoftwareOperation {
    handle: u64,
    mode: EngineMode,
    nonce: [u8; NONCE_LENGTH],
    material: Zeroizing<[u8; 32]>,
    user_authentication_required: bool,
    approvals: Approvals,
    consumed: AtomicBool,
}

impl KeystoreOperation for SoftwareOperation {
    fn mode(&self) -> EngineMode {
        self.mode
    }

    fn nonce(&self) -> Vec<u8> {
        self.nonce.to_vec()
    }

    fn operation_handle(&self) -> u64 {
        self.handle
    }

    fn finish(&self, input: Vec<u8>) -> KeystoreResult<Vec<u8>> {
        if self.consumed.load(Ordering::SeqCst) {
            return Err(KeystoreError::OperationConsumed);
        }
        if self.user_authentication_required && !lock(&self.approvals).remove(&self.handle) {
            return Err(KeystoreError::UserNotAuthenticated);
        }
        if self.consumed.swap(true, Ordering::SeqCst) {
            return Err(KeystoreError::OperationConsumed);
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.material[..]));
        let nonce = Nonce::from_slice(&self.nonce);
        match self.mode {
            EngineMode::Encrypt => cipher
                .encrypt(nonce, input.as_slice())
                .map_err(|err| KeystoreError::Internal(err.to_string())),
            EngineMode::Decrypt => cipher
                .decrypt(nonce, input.as_slice())
                .map_err(|_| KeystoreError::AuthenticationTagMismatch),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
