//! Common test utilities shared across integration tests.

use std::path::Path;
use std::sync::Arc;

use keyguard_core::gate::SimulatedGate;
use keyguard_core::keystore::SoftwareKeystore;
use keyguard_core::store::FileKeyValueStore;
use keyguard_core::{KeyValueStore, KeyguardConfig, SecretKeeper};

/// One simulated device: keystore, biometric gate and preference store.
pub struct TestDevice {
    /// Software-backed keystore.
    pub keystore: Arc<SoftwareKeystore>,
    /// Simulated biometric gate.
    pub gate: Arc<SimulatedGate>,
    /// Preference store.
    pub store: Arc<dyn KeyValueStore>,
}

impl TestDevice {
    /// A device backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let keystore = Arc::new(SoftwareKeystore::new());
        let gate = Arc::new(SimulatedGate::new(keystore.clone()));
        Self {
            keystore,
            gate,
            store,
        }
    }

    /// A device with an in-memory preference store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(keyguard_core::store::MemoryKeyValueStore::new()))
    }

    /// A device whose preferences live in `path`.
    pub fn on_disk(path: &Path) -> Self {
        Self::new(Arc::new(FileKeyValueStore::open(path).expect("open store")))
    }

    /// A keeper as the app would create it at launch.
    pub fn keeper(&self) -> SecretKeeper {
        SecretKeeper::new(
            KeyguardConfig::default(),
            self.keystore.clone(),
            self.store.clone(),
            self.gate.clone(),
        )
    }
}
