//! Key persistence across restarts with the redb-backed store

use keyward_core::{Deployment, KeyManager, KeyManagerConfig, RedbStore};
use keyward_harness::{DAY, SimEnv};
use tempfile::tempdir;

#[tokio::test]
async fn key_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.redb");
    let env = SimEnv::with_seed(1);

    let original = {
        let store = RedbStore::open(&path).unwrap();
        let manager =
            KeyManager::new(env.clone(), Deployment::Device, store, KeyManagerConfig::default());
        manager.get_or_create_key().await.unwrap()
    };

    let store = RedbStore::open(&path).unwrap();
    let manager = KeyManager::new(env.clone(), Deployment::Device, store, KeyManagerConfig::default());

    assert_eq!(manager.get_or_create_key().await.unwrap(), original);
    assert_eq!(manager.retrieve_version().await, 1);
}

#[tokio::test]
async fn rotation_and_retention_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("keys.redb");
    let env = SimEnv::with_seed(2);

    let (first, second) = {
        let store = RedbStore::open(&path).unwrap();
        let manager =
            KeyManager::new(env.clone(), Deployment::Device, store, KeyManagerConfig::default());
        let first = manager.get_or_create_key().await.unwrap();
        env.advance(DAY * 8);
        let second = manager.get_or_create_key().await.unwrap();
        (first, second)
    };

    let store = RedbStore::open(&path).unwrap();
    let manager = KeyManager::new(env, Deployment::Device, store, KeyManagerConfig::default());

    assert_eq!(manager.retrieve().await, Some(second));
    assert_eq!(manager.retrieve_version().await, 2);
    assert_eq!(manager.key_for_version(1).await, Some(first));

    assert!(manager.clear_all_keys().await.is_complete());
    assert_eq!(manager.get_key_info().await.version, 0);
}
