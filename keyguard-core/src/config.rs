use serde::{Deserialize, Serialize};

use crate::{defaults::DEFAULT_KEY_NAME, gate::PromptInfo, KeeperError};

/// Host configuration for a [`SecretKeeper`](crate::SecretKeeper).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct KeyguardConfig {
    /// Alias of the vault key inside the keystore.
    pub key_name: String,
    /// Text shown by the authorization prompt.
    pub prompt: PromptInfo,
}

impl Default for KeyguardConfig {
    fn default() -> Self {
        Self {
            key_name: DEFAULT_KEY_NAME.to_string(),
            prompt: PromptInfo::default(),
        }
    }
}

impl KeyguardConfig {
    /// Parses a JSON configuration. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`KeeperError::Unknown`] if the JSON is malformed or the key
    /// name is blank.
    pub fn from_json(json: &str) -> Result<Self, KeeperError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| KeeperError::Unknown(format!("invalid config: {err}")))?;
        if config.key_name.trim().is_empty() {
            return Err(KeeperError::Unknown(
                "invalid config: key_name is blank".to_string(),
            ));
        }
        Ok(config)
    }
}

/// Parses a JSON [`KeyguardConfig`] for foreign callers.
///
/// # Errors
/// See [`KeyguardConfig::from_json`].
#[uniffi::export]
#[allow(clippy::needless_pass_by_value)]
pub fn keyguard_config_from_json(json: String) -> Result<KeyguardConfig, KeeperError> {
    KeyguardConfig::from_json(&json)
}
