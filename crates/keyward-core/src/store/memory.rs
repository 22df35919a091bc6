use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{CredentialStore, ItemOptions, StoreError};

/// In-memory credential store for testing and simulation
///
/// Entries are keyed by `(service, key)`. All state is wrapped in
/// Arc<Mutex<>> so clones share entries. Every operation yields to the
/// executor once before touching the map, modelling the await point of a
/// real keychain call so concurrent callers actually interleave.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<(String, String), String>>>,
}

impl MemoryStore {
    /// Create a new empty `MemoryStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all services.
    ///
    /// Useful for debugging and testing.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Read an entry without going through the async API.
    pub fn peek(&self, service: &str, key: &str) -> Option<String> {
        self.lock().get(&(service.to_string(), key.to_string())).cloned()
    }

    /// Write an entry without going through the async API.
    ///
    /// Lets tests plant corrupt or back-dated values.
    pub fn plant(&self, service: &str, key: &str, value: &str) {
        self.lock().insert((service.to_string(), key.to_string()), value.to_string());
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), String>> {
        self.inner.lock().expect("Mutex poisoned")
    }
}

impl CredentialStore for MemoryStore {
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &ItemOptions,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.lock().insert((options.service.clone(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn get_item(&self, key: &str, options: &ItemOptions) -> Result<Option<String>, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.lock().get(&(options.service.clone(), key.to_string())).cloned())
    }

    async fn delete_item(&self, key: &str, options: &ItemOptions) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.lock().remove(&(options.service.clone(), key.to_string()));
        Ok(())
    }
}
