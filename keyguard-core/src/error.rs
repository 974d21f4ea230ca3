use thiserror::Error;

/// Result type for keystore boundary calls.
pub type KeystoreResult<T> = Result<T, KeystoreError>;

/// Result type for durable store writes.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a [`SecureKeystore`](crate::SecureKeystore) implementation.
#[derive(Debug, Error, uniffi::Error)]
pub enum KeystoreError {
    /// The keystore could not be opened or reached.
    #[error("keystore unavailable: {0}")]
    Unavailable(String),

    /// No key exists under the requested alias.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The key was invalidated by a change in the authorization enrollment
    /// (for example a fingerprint was added or removed). It can never be used
    /// again and must be deleted.
    #[error("key permanently invalidated: {0}")]
    KeyPermanentlyInvalidated(String),

    /// The operation was used before the user authorized it.
    #[error("user not authenticated")]
    UserNotAuthenticated,

    /// GCM tag verification failed while decrypting.
    #[error("authentication tag mismatch")]
    AuthenticationTagMismatch,

    /// Key generation or operation parameters were rejected.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The single-use operation was already finished.
    #[error("operation already consumed")]
    OperationConsumed,

    /// Any other keystore failure.
    #[error("keystore internal error: {0}")]
    Internal(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KeystoreError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) write.
#[derive(Debug, Error, uniffi::Error)]
pub enum StoreError {
    /// The backing file or preference file could not be written.
    #[error("store io error: {0}")]
    Io(String),

    /// The persisted document could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for StoreError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Errors from looking up, creating or purging the vault key.
///
/// These never abort the process; callers treat them as "no key".
#[derive(Debug, Error, uniffi::Error)]
pub enum KeyAccessError {
    /// The keystore could not be loaded.
    #[error("keystore unavailable: {0}")]
    Unavailable(String),

    /// The keystore rejected the key generation parameters.
    #[error("key generation rejected: {0}")]
    GenerationRejected(String),

    /// Any other failure while accessing the key.
    #[error("key access failed: {0}")]
    Unknown(String),
}

/// Errors from building a cipher engine.
#[derive(Debug, Error, uniffi::Error)]
pub enum EngineError {
    /// No usable nonce is stored, so there is nothing to decrypt.
    #[error("missing nonce")]
    MissingNonce,

    /// The vault key was permanently invalidated. The key and the sealed
    /// record have been purged; the user must re-enroll before retrying.
    #[error("key invalidated")]
    KeyInvalidated,

    /// Any other failure while resolving the cipher, the key or initializing
    /// the engine.
    #[error("engine error: {0}")]
    Unknown(String),
}

/// Errors from sealing or opening the secret.
#[derive(Debug, Error, uniffi::Error)]
pub enum CodecError {
    /// No sealed record is persisted.
    #[error("no data")]
    NoData,

    /// The ciphertext failed GCM authentication: it was tampered with or does
    /// not belong to this key and nonce.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Any other failure during the transform or persistence.
    #[error("codec error: {0}")]
    Unknown(String),
}

/// Errors from the authorization gate step.
#[derive(Debug, Error, uniffi::Error)]
pub enum AuthorizationError {
    /// The user dismissed the prompt or chose the negative button.
    #[error("authorization cancelled")]
    Cancelled,

    /// The gate reported an unrecoverable error (lockout, timeout, hardware).
    #[error("authorization failed ({code}): {reason}")]
    Failed {
        /// Platform error code.
        code: i32,
        /// Platform error message.
        reason: String,
    },
}

/// Errors surfaced by [`SecretKeeper`](crate::SecretKeeper) to the host.
///
/// `NoData` and `AuthenticationFailed` stay distinct so a tampered record is
/// never presented as an empty one.
#[derive(Debug, Error, uniffi::Error)]
pub enum KeeperError {
    /// The device cannot run the authorization gate right now.
    #[error("authorization gate unavailable: {0}")]
    GateUnavailable(String),

    /// The user cancelled the prompt.
    #[error("authorization cancelled")]
    AuthorizationCancelled,

    /// The prompt failed.
    #[error("authorization failed ({code}): {reason}")]
    AuthorizationFailed {
        /// Platform error code.
        code: i32,
        /// Platform error message.
        reason: String,
    },

    /// No nonce is stored.
    #[error("missing nonce")]
    MissingNonce,

    /// The key was invalidated and has been purged along with the record.
    #[error("key invalidated")]
    KeyInvalidated,

    /// No sealed record is stored.
    #[error("no data")]
    NoData,

    /// The stored ciphertext failed authentication.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Key lookup, generation or purge failed.
    #[error("key access failed: {0}")]
    KeyAccess(String),

    /// Any other failure.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl From<EngineError> for KeeperError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::MissingNonce => Self::MissingNonce,
            EngineError::KeyInvalidated => Self::KeyInvalidated,
            EngineError::Unknown(reason) => Self::Unknown(reason),
        }
    }
}

impl From<CodecError> for KeeperError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::NoData => Self::NoData,
            CodecError::AuthenticationFailed => Self::AuthenticationFailed,
            CodecError::Unknown(reason) => Self::Unknown(reason),
        }
    }
}

impl From<AuthorizationError> for KeeperError {
    fn from(error: AuthorizationError) -> Self {
        match error {
            AuthorizationError::Cancelled => Self::AuthorizationCancelled,
            AuthorizationError::Failed { code, reason } => {
                Self::AuthorizationFailed { code, reason }
            }
        }
    }
}

impl From<KeyAccessError> for KeeperError {
    fn from(error: KeyAccessError) -> Self {
        Self::KeyAccess(error.to_string())
    }
}
