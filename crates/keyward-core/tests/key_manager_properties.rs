//! Property tests for key generation, versioning and age-based rotation

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use keyward_core::{Deployment, KEY_LEN, KeyManager, KeyManagerConfig, MemoryStore};
use keyward_harness::{DAY, SimEnv};
use proptest::prelude::*;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build runtime")
        .block_on(future)
}

fn device_manager(env: &SimEnv) -> KeyManager<SimEnv, Deployment, MemoryStore> {
    KeyManager::new(env.clone(), Deployment::Device, MemoryStore::new(), KeyManagerConfig::default())
}

#[test]
fn prop_generated_keys_are_32_bytes() {
    proptest!(|(seed in any::<u64>())| {
        let manager = device_manager(&SimEnv::with_seed(seed));

        let key = manager.generate_key().expect("entropy available");
        let decoded = STANDARD.decode(key.to_base64().as_bytes()).expect("valid base64");

        prop_assert_eq!(decoded.len(), KEY_LEN);
    });
}

#[test]
fn prop_versions_increase_by_one_per_rotation() {
    proptest!(ProptestConfig::with_cases(32), |(
        seed in any::<u64>(),
        rotations in 1usize..20,
        retained in 0usize..4,
    )| {
        let env = SimEnv::with_seed(seed);
        let config = KeyManagerConfig { retained_keys: retained, ..KeyManagerConfig::default() };
        let manager = KeyManager::new(env, Deployment::Device, MemoryStore::new(), config);

        let versions = block_on(async {
            manager.get_or_create_key().await.expect("create");
            let mut versions = vec![manager.retrieve_version().await];
            for _ in 0..rotations {
                manager.rotate().await.expect("rotate");
                versions.push(manager.retrieve_version().await);
            }
            versions
        });

        let expected: Vec<u32> = (1..=rotations as u32 + 1).collect();
        prop_assert_eq!(versions, expected);

        let retained_count = block_on(manager.retained_keys()).len();
        prop_assert_eq!(retained_count, retained.min(rotations));
    });
}

#[test]
fn prop_rotation_triggers_only_past_interval() {
    proptest!(|(
        seed in any::<u64>(),
        elapsed_millis in 0u64..(30 * 86_400_000),
    )| {
        let env = SimEnv::with_seed(seed);
        let manager = device_manager(&env);

        let needs = block_on(async {
            manager.get_or_create_key().await.expect("create");
            env.advance(Duration::from_millis(elapsed_millis));
            manager.needs_rotation().await
        });

        prop_assert_eq!(needs, elapsed_millis > 7 * 86_400_000);
    });
}

#[test]
fn eight_days_rotates_one_day_does_not() {
    let env = SimEnv::with_seed(99);
    let manager = device_manager(&env);

    block_on(async {
        manager.get_or_create_key().await.expect("create");

        env.advance(DAY);
        assert!(!manager.needs_rotation().await);

        env.advance(DAY * 7);
        assert!(manager.needs_rotation().await);
    });
}
