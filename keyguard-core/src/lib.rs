#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Core of the biometric-gated secret store.
//!
//! A single AES-256-GCM key lives inside a platform keystore and is usable only
//! after an external authorization event (biometric prompt or equivalent). The
//! crate builds single-use cipher engines bound to that key, hands them to the
//! [`AuthorizationGate`], and seals or opens one secret whose nonce and
//! ciphertext are persisted in a durable key-value store.
//!
//! Every platform capability is a trait that foreign code implements through
//! `UniFFI`:
//!
//! - [`SecureKeystore`] / [`KeystoreOperation`]: the protected keystore
//!   (Android Keystore, iOS Keychain + Secure Enclave).
//! - [`KeyValueStore`]: durable string store (`SharedPreferences`,
//!   `UserDefaults`).
//! - [`AuthorizationGate`]: the biometric prompt.
//! - [`Logger`](logger::Logger): log sink.
//!
//! [`SecretKeeper`] wires them together into the encrypt and decrypt flows.

pub mod codec;
pub mod defaults;
pub mod engine;
pub mod gate;
pub mod keystore;
pub mod logger;
pub mod store;
pub mod vault;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod keeper;
pub use keeper::*;

#[cfg(test)]
mod tests_utils;

pub use codec::AuthenticatedCodec;
pub use engine::{AuthorizedEngine, CipherEngine, CipherEngineFactory, EngineMode};
pub use gate::{
    authorize, AuthorizationGate, AuthorizationOutcome, GateAvailability, PromptInfo,
};
pub use keystore::{
    GcmParameters, KeyGenParameters, KeystoreOperation, SecureKeystore,
};
pub use store::{KeyValueStore, RecordStore, SealedRecord, StringEntry};
pub use vault::{SecureKeyVault, VaultKey};

uniffi::setup_scaffolding!("keyguard_core");
