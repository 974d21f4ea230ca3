//! Fixed parameters of the sealing scheme and the persisted record layout.

/// Key alias used when the host does not configure one.
pub const DEFAULT_KEY_NAME: &str = "keyguard_secret_key";

/// Key algorithm requested from the keystore.
pub const KEY_ALGORITHM: &str = "AES";

/// Block mode requested from the keystore.
pub const BLOCK_MODE: &str = "GCM";

/// Padding requested from the keystore. GCM is a stream mode.
pub const ENCRYPTION_PADDING: &str = "NoPadding";

/// Cipher transformation in `algorithm/mode/padding` form.
pub const TRANSFORMATION: &str = "AES/GCM/NoPadding";

/// Size of the generated vault key.
pub const KEY_SIZE_BITS: u32 = 256;

/// Length of the GCM authentication tag.
pub const GCM_TAG_LENGTH_BITS: u32 = 128;

/// Length of the GCM authentication tag in bytes.
pub const GCM_TAG_LENGTH: usize = 16;

/// Length of the nonce generated for every encryption (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// Store key holding the base64 nonce of the sealed record.
pub const PREF_BASE64_ENCRYPTION_IV: &str = "encryption_iv";

/// Store key holding the base64 ciphertext of the sealed record.
pub const PREF_BASE64_SECRET_TEXT_CIPHER: &str = "secret_text_cipher";
