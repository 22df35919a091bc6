//! Chaos tests for the key manager
//!
//! Wraps the store in `ChaoticStore` and checks the manager keeps its
//! promises when the keychain misbehaves:
//! - `get_or_create_key` always yields a key
//! - `get_key_info` never fails
//! - The stored version never goes backwards

use keyward_core::{
    ChaoticStore, Deployment, KeyInfo, KeyManager, KeyManagerConfig, MemoryStore,
    config::DEFAULT_SERVICE, manager::VERSION_FIELD,
};
use keyward_harness::{DAY, SimEnv};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
        .block_on(future)
}

#[tokio::test]
async fn key_info_survives_total_read_failure() {
    let env = SimEnv::with_seed(1);
    let memory = MemoryStore::new();
    KeyManager::new(env.clone(), Deployment::Device, memory.clone(), KeyManagerConfig::default())
        .get_or_create_key()
        .await
        .expect("healthy create");

    let broken = KeyManager::new(
        env,
        Deployment::Device,
        ChaoticStore::new(memory, 1.0),
        KeyManagerConfig::default(),
    );

    assert_eq!(
        broken.get_key_info().await,
        KeyInfo {
            has_key: false,
            version: 0,
            age_millis: 0,
            needs_rotation: true,
            retained_versions: Vec::new(),
        }
    );
}

#[tokio::test]
async fn total_failure_still_yields_keys() {
    let env = SimEnv::with_seed(2);
    let chaotic = ChaoticStore::new(MemoryStore::new(), 1.0);
    let manager = KeyManager::new(env, Deployment::Device, chaotic.clone(), KeyManagerConfig::default());

    for _ in 0..10 {
        manager.get_or_create_key().await.expect("fallback key");
    }

    assert!(chaotic.inner().is_empty());
    assert!(chaotic.operation_count() >= 10);
}

#[test]
fn prop_chaos_keys_always_issued_and_versions_monotonic() {
    proptest!(ProptestConfig::with_cases(64), |(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
        steps in proptest::collection::vec((any::<bool>(), any::<bool>()), 5..40),
    )| {
        let env = SimEnv::with_seed(seed);
        let memory = MemoryStore::new();
        let chaotic = ChaoticStore::with_seed(memory.clone(), failure_rate, seed);
        let manager =
            KeyManager::new(env.clone(), Deployment::Device, chaotic, KeyManagerConfig::default());

        let outcome: Result<(), TestCaseError> = block_on(async move {
            let mut last_version = 0u32;
            for (advance, force) in steps {
                if advance {
                    env.advance(DAY * 8);
                }
                if force {
                    let _ = manager.force_key_rotation().await;
                } else {
                    prop_assert!(manager.get_or_create_key().await.is_ok());
                }

                let stored = memory
                    .peek(DEFAULT_SERVICE, VERSION_FIELD)
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0);
                prop_assert!(
                    stored >= last_version,
                    "version went from {} to {}",
                    last_version,
                    stored
                );
                last_version = stored;
            }
            Ok(())
        });
        outcome?;
    });
}
