//! Integration tests for the secret storage flow.

mod common;

use std::sync::Arc;
use std::thread;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use test_case::test_case;

use keyguard_core::defaults::{GCM_TAG_LENGTH, NONCE_LENGTH};
use keyguard_core::gate::SimulatedGate;
use keyguard_core::store::{FileKeyValueStore, MemoryKeyValueStore};
use keyguard_core::{
    AuthorizationGate, AuthorizationOutcome, GateAvailability, KeeperError, KeyValueStore,
    KeyguardConfig, KeystoreOperation, PromptInfo, RecordStore, SealedRecord, SecretKeeper,
};

#[test_case("" ; "empty")]
#[test_case("hello world" ; "ascii")]
#[test_case("pässwörd 🔐 日本語" ; "multi byte")]
#[test_case(&"x".repeat(4096) ; "long")]
#[tokio::test]
async fn test_round_trip(plaintext: &str) {
    let device = common::TestDevice::in_memory();
    let keeper = device.keeper();

    let record = keeper
        .encrypt_secret(plaintext.to_string())
        .await
        .expect("encrypt");
    let ciphertext = STANDARD.decode(&record.ciphertext).expect("base64");
    assert_eq!(
        STANDARD.decode(&record.nonce).expect("base64").len(),
        NONCE_LENGTH
    );
    assert_eq!(ciphertext.len(), plaintext.len() + GCM_TAG_LENGTH);

    assert_eq!(keeper.decrypt_secret().await.expect("decrypt"), plaintext);
}

#[tokio::test]
async fn test_secret_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("keyguard_prefs.json");
    let device = common::TestDevice::on_disk(&path);

    let record = device
        .keeper()
        .encrypt_secret("session token".to_string())
        .await
        .expect("encrypt");

    let contents = std::fs::read_to_string(&path).expect("read prefs");
    assert!(contents.contains("encryption_iv"));
    assert!(contents.contains(&record.ciphertext));
    assert!(!contents.contains("session token"));

    let reopened: Arc<dyn KeyValueStore> =
        Arc::new(FileKeyValueStore::open(&path).expect("reopen"));
    let keeper = SecretKeeper::new(
        KeyguardConfig::default(),
        device.keystore.clone(),
        reopened,
        device.gate.clone(),
    );
    assert_eq!(keeper.stored_record(), Some(record));
    assert_eq!(
        keeper.decrypt_secret().await.expect("decrypt"),
        "session token"
    );
}

#[tokio::test]
async fn test_any_bit_flip_is_detected() {
    let device = common::TestDevice::in_memory();
    let keeper = device.keeper();
    let original = keeper
        .encrypt_secret("hello world".to_string())
        .await
        .expect("encrypt");
    let records = RecordStore::new(device.store.clone());
    let bytes = STANDARD.decode(&original.ciphertext).expect("base64");

    for (index, bit) in [(0, 0), (5, 3), (10, 7), (bytes.len() - 1, 1)] {
        let mut tampered = bytes.clone();
        tampered[index] ^= 1 << bit;
        records
            .save(&SealedRecord {
                nonce: original.nonce.clone(),
                ciphertext: STANDARD.encode(&tampered),
            })
            .expect("save");

        assert!(
            matches!(
                keeper.decrypt_secret().await,
                Err(KeeperError::AuthenticationFailed)
            ),
            "flip of bit {bit} in byte {index} went unnoticed"
        );
    }

    let mut nonce = STANDARD.decode(&original.nonce).expect("base64");
    nonce[0] ^= 1;
    records
        .save(&SealedRecord {
            nonce: STANDARD.encode(&nonce),
            ciphertext: original.ciphertext,
        })
        .expect("save");
    assert!(matches!(
        keeper.decrypt_secret().await,
        Err(KeeperError::AuthenticationFailed)
    ));
}

#[tokio::test]
async fn test_nonce_without_ciphertext_is_no_data() {
    let device = common::TestDevice::in_memory();
    device
        .store
        .set_string("encryption_iv".to_string(), STANDARD.encode([3u8; 12]))
        .expect("set");

    let keeper = device.keeper();
    assert!(matches!(
        keeper.decrypt_secret().await,
        Err(KeeperError::NoData)
    ));
    assert_eq!(device.gate.prompts(), 0);
    assert_eq!(device.keystore.key_count(), 0);
}

#[tokio::test]
async fn test_invalidation_recovery() {
    let device = common::TestDevice::in_memory();
    let keeper = device.keeper();
    keeper
        .encrypt_secret("before enrollment change".to_string())
        .await
        .expect("encrypt");

    device.keystore.change_enrollment();
    assert!(matches!(
        keeper.encrypt_secret("after".to_string()).await,
        Err(KeeperError::KeyInvalidated)
    ));
    assert_eq!(device.keystore.key_count(), 0);
    assert_eq!(device.store.get_string("encryption_iv".to_string()), "");
    assert_eq!(device.store.get_string("secret_text_cipher".to_string()), "");
    assert!(keeper.key_was_invalidated());

    assert!(matches!(
        keeper.decrypt_secret().await,
        Err(KeeperError::MissingNonce)
    ));

    keeper
        .encrypt_secret("after".to_string())
        .await
        .expect("encrypt with fresh key");
    assert_eq!(device.keystore.key_count(), 1);
    assert_eq!(keeper.decrypt_secret().await.expect("decrypt"), "after");
}

#[tokio::test]
async fn test_failed_prompt_leaves_state_unchanged() {
    let device = common::TestDevice::in_memory();
    let keeper = device.keeper();
    let record = keeper
        .encrypt_secret("keep me".to_string())
        .await
        .expect("encrypt");

    device.gate.push_outcome(AuthorizationOutcome::Error {
        code: 7,
        message: "Too many attempts. Try again later.".to_string(),
    });
    match keeper.decrypt_secret().await {
        Err(KeeperError::AuthorizationFailed { code, .. }) => assert_eq!(code, 7),
        other => panic!("unexpected result: {other:?}"),
    }

    device.gate.push_outcome(AuthorizationOutcome::Cancelled);
    assert!(matches!(
        keeper.encrypt_secret("replacement".to_string()).await,
        Err(KeeperError::AuthorizationCancelled)
    ));
    assert_eq!(keeper.stored_record(), Some(record));

    device.gate.set_availability(GateAvailability::HardwareUnavailable);
    assert!(matches!(
        keeper.decrypt_secret().await,
        Err(KeeperError::GateUnavailable(_))
    ));
    device.gate.set_availability(GateAvailability::Available);
    assert_eq!(keeper.decrypt_secret().await.expect("decrypt"), "keep me");
}

/// Host gate that reports success without binding the operation to an
/// authentication event.
struct UnboundGate;

#[async_trait::async_trait]
impl AuthorizationGate for UnboundGate {
    fn availability(&self) -> GateAvailability {
        GateAvailability::Available
    }

    async fn authenticate(
        &self,
        _prompt: PromptInfo,
        _operation: Arc<dyn KeystoreOperation>,
    ) -> AuthorizationOutcome {
        AuthorizationOutcome::Succeeded
    }
}

/// Host gate that suspends once before prompting, like a real prompt waiting
/// on the UI thread.
struct SuspendingGate {
    inner: SimulatedGate,
}

#[async_trait::async_trait]
impl AuthorizationGate for SuspendingGate {
    fn availability(&self) -> GateAvailability {
        self.inner.availability()
    }

    async fn authenticate(
        &self,
        prompt: PromptInfo,
        operation: Arc<dyn KeystoreOperation>,
    ) -> AuthorizationOutcome {
        tokio::task::yield_now().await;
        self.inner.authenticate(prompt, operation).await
    }
}

#[tokio::test]
async fn test_concurrent_encrypt_and_decrypt_pair_consistently() {
    let device = common::TestDevice::in_memory();
    let keeper = SecretKeeper::new(
        KeyguardConfig::default(),
        device.keystore.clone(),
        device.store.clone(),
        Arc::new(SuspendingGate {
            inner: SimulatedGate::new(device.keystore.clone()),
        }),
    );
    keeper
        .encrypt_secret("first".to_string())
        .await
        .expect("seed");

    let (sealed, opened) = tokio::join!(
        keeper.encrypt_secret("second".to_string()),
        keeper.decrypt_secret()
    );

    sealed.expect("encrypt");
    let opened = opened.expect("untampered store must open");
    assert!(opened == "first" || opened == "second", "opened {opened}");
    assert_eq!(keeper.decrypt_secret().await.expect("decrypt"), "second");
}

#[tokio::test]
async fn test_keystore_refuses_unbound_success() {
    let device = common::TestDevice::in_memory();
    let keeper = SecretKeeper::new(
        KeyguardConfig::default(),
        device.keystore.clone(),
        device.store.clone(),
        Arc::new(UnboundGate),
    );

    assert!(matches!(
        keeper.encrypt_secret("secret".to_string()).await,
        Err(KeeperError::Unknown(_))
    ));
    assert!(!keeper.has_secret());
}

#[tokio::test]
async fn test_custom_key_name_from_config() {
    let device = common::TestDevice::in_memory();
    let config = KeyguardConfig::from_json(r#"{"key_name":"wallet_pin"}"#).expect("config");
    let keeper = SecretKeeper::new(
        config,
        device.keystore.clone(),
        device.store.clone(),
        Arc::new(SimulatedGate::new(device.keystore.clone())),
    );

    keeper
        .encrypt_secret("1234".to_string())
        .await
        .expect("encrypt");
    assert_eq!(keeper.config().key_name, "wallet_pin");
    assert_eq!(device.keystore.key_count(), 1);
    assert_eq!(keeper.decrypt_secret().await.expect("decrypt"), "1234");
}

#[test]
fn test_record_pair_is_never_torn_in_memory() {
    assert_pair_never_torn(Arc::new(MemoryKeyValueStore::new()));
}

#[test]
fn test_record_pair_is_never_torn_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileKeyValueStore::open(dir.path().join("prefs.json")).expect("open");
    assert_pair_never_torn(Arc::new(store));
}

fn assert_pair_never_torn(store: Arc<dyn KeyValueStore>) {
    let records = RecordStore::new(store);
    let written: Vec<SealedRecord> = (0u8..8)
        .map(|i| SealedRecord::from_parts(&[i; 12], &[i; 27]))
        .collect();
    records.save(&written[0]).expect("seed");

    let writers: Vec<_> = written
        .iter()
        .cloned()
        .map(|record| {
            let records = records.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    records.save(&record).expect("save");
                }
            })
        })
        .collect();

    let reader = {
        let records = records.clone();
        let written = written.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let loaded = records.load().expect("record present");
                assert!(written.contains(&loaded), "torn record: {loaded:?}");
            }
        })
    };

    for writer in writers {
        writer.join().expect("writer");
    }
    reader.join().expect("reader");
}
