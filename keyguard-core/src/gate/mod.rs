//! Authorization gate boundary.
//!
//! The gate is the human-presence check (biometric prompt). It receives the
//! keystore operation of one specific engine, authenticates the user against
//! it, and resolves with an [`AuthorizationOutcome`]. On Android this is a
//! `BiometricPrompt` shown with `CryptoObject(cipher)`; a Kotlin implementation
//! suspends until `onAuthenticationSucceeded` or `onAuthenticationError`.

mod simulated;

pub use simulated::SimulatedGate;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{AuthorizedEngine, CipherEngine};
use crate::keystore::KeystoreOperation;
use crate::AuthorizationError;

/// Prompt text and behaviour. Opaque to the cryptographic core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct PromptInfo {
    /// Prompt title, e.g. "Sign in".
    pub title: String,
    /// Prompt subtitle.
    pub subtitle: String,
    /// Longer explanation shown under the subtitle.
    pub description: String,
    /// Whether the user must confirm after a passive biometric match.
    pub confirmation_required: bool,
    /// Label of the negative (fallback) button.
    pub negative_button_text: String,
}

impl Default for PromptInfo {
    fn default() -> Self {
        Self {
            title: "Sign in".to_string(),
            subtitle: "Biometric authentication".to_string(),
            description: "Confirm biometric to continue".to_string(),
            confirmation_required: false,
            negative_button_text: "Use app password".to_string(),
        }
    }
}

/// Whether the device can run the gate right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum GateAvailability {
    /// Ready to authenticate.
    Available,
    /// The device has no suitable sensor.
    NoHardware,
    /// The sensor exists but is temporarily unavailable.
    HardwareUnavailable,
    /// No biometric is enrolled.
    NoneEnrolled,
    /// The platform could not tell.
    Unknown,
}

/// Terminal result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AuthorizationOutcome {
    /// The user authenticated; the operation may be finished.
    Succeeded,
    /// The user dismissed the prompt or pressed the negative button.
    Cancelled,
    /// The attempt ended in an error (lockout, timeout, hardware failure).
    Error {
        /// Platform error code.
        code: i32,
        /// Platform error message.
        message: String,
    },
}

/// Human-presence check bound to one keystore operation.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// Reports whether authentication is currently possible.
    fn availability(&self) -> GateAvailability;

    /// Prompts the user and authenticates `operation`. Resolves once the
    /// prompt reaches a terminal state.
    async fn authenticate(
        &self,
        prompt: PromptInfo,
        operation: Arc<dyn KeystoreOperation>,
    ) -> AuthorizationOutcome;
}

/// Runs `engine` through `gate`.
///
/// Returns the same engine as an [`AuthorizedEngine`] only if the gate
/// succeeded for its operation. On any other outcome the engine is dropped.
///
/// # Errors
/// Returns [`AuthorizationError::Cancelled`] or
/// [`AuthorizationError::Failed`].
pub async fn authorize(
    gate: &dyn AuthorizationGate,
    prompt: &PromptInfo,
    engine: CipherEngine,
) -> Result<AuthorizedEngine, AuthorizationError> {
    let mode = engine.mode();
    match gate.authenticate(prompt.clone(), engine.operation()).await {
        AuthorizationOutcome::Succeeded => {
            log::debug!("authorization succeeded for {mode} engine");
            Ok(AuthorizedEngine::new(engine))
        }
        AuthorizationOutcome::Cancelled => {
            log::info!("authorization cancelled for {mode} engine");
            Err(AuthorizationError::Cancelled)
        }
        AuthorizationOutcome::Error { code, message } => {
            log::warn!("authorization error {code} for {mode} engine: {message}");
            Err(AuthorizationError::Failed {
                code,
                reason: message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CipherEngineFactory, EngineMode};
    use crate::keystore::SoftwareKeystore;
    use crate::store::{MemoryKeyValueStore, RecordStore};
    use crate::vault::SecureKeyVault;

    fn engine(keystore: &Arc<SoftwareKeystore>) -> CipherEngine {
        let records = RecordStore::new(Arc::new(MemoryKeyValueStore::new()));
        let vault = SecureKeyVault::new(keystore.clone(), records);
        CipherEngineFactory::new(vault)
            .build_encrypt_engine("gate_key")
            .expect("engine")
    }

    #[tokio::test]
    async fn test_success_returns_same_engine() {
        let keystore = Arc::new(SoftwareKeystore::new());
        let gate = SimulatedGate::new(keystore.clone());
        let engine = engine(&keystore);
        let nonce = engine.nonce();

        let authorized = authorize(&gate, &PromptInfo::default(), engine)
            .await
            .expect("authorized");
        assert_eq!(authorized.mode(), EngineMode::Encrypt);
        assert_eq!(authorized.nonce(), nonce);
        assert_eq!(gate.prompts(), 1);
    }

    #[tokio::test]
    async fn test_cancel_and_error_outcomes() {
        let keystore = Arc::new(SoftwareKeystore::new());
        let gate = SimulatedGate::new(keystore.clone());
        gate.push_outcome(AuthorizationOutcome::Cancelled);
        gate.push_outcome(AuthorizationOutcome::Error {
            code: 7,
            message: "Too many attempts".to_string(),
        });

        assert!(matches!(
            authorize(&gate, &PromptInfo::default(), engine(&keystore)).await,
            Err(AuthorizationError::Cancelled)
        ));
        match authorize(&gate, &PromptInfo::default(), engine(&keystore)).await {
            Err(AuthorizationError::Failed { code, .. }) => assert_eq!(code, 7),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_default_prompt() {
        let prompt = PromptInfo::default();
        assert_eq!(prompt.title, "Sign in");
        assert!(!prompt.confirmation_required);
    }
}
