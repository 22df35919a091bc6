//! Redb-backed durable credential store.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Every
//! item write is its own transaction, matching the per-item guarantees of a
//! platform keychain. Redb calls block, so each operation runs on Tokio's
//! blocking pool; calling these methods outside a Tokio runtime panics.

use std::{path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};

use super::{CredentialStore, ItemOptions, StoreError};

/// Table: credentials
/// Key: (service, key)
/// Value: stored string
const CREDENTIALS: TableDefinition<(&str, &str), &str> = TableDefinition::new("credentials");

/// Durable credential store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the CREDENTIALS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(CREDENTIALS).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn write(&self, service: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table =
                txn.open_table(CREDENTIALS).map_err(|e| StoreError::Io(e.to_string()))?;
            table.insert((service, key), value).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))
    }

    fn read(&self, service: &str, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn.open_table(CREDENTIALS).map_err(|e| StoreError::Io(e.to_string()))?;

        let value = table.get((service, key)).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(value.map(|v| v.value().to_string()))
    }

    fn remove(&self, service: &str, key: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table =
                txn.open_table(CREDENTIALS).map_err(|e| StoreError::Io(e.to_string()))?;
            table.remove((service, key)).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| StoreError::Io(format!("blocking task failed: {e}")))?
    }
}

impl CredentialStore for RedbStore {
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &ItemOptions,
    ) -> Result<(), StoreError> {
        let (service, key, value) = (options.service.clone(), key.to_string(), value.to_string());
        self.blocking(move |store| store.write(&service, &key, &value)).await
    }

    async fn get_item(&self, key: &str, options: &ItemOptions) -> Result<Option<String>, StoreError> {
        let (service, key) = (options.service.clone(), key.to_string());
        self.blocking(move |store| store.read(&service, &key)).await
    }

    async fn delete_item(&self, key: &str, options: &ItemOptions) -> Result<(), StoreError> {
        let (service, key) = (options.service.clone(), key.to_string());
        self.blocking(move |store| store.remove(&service, &key)).await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn redb_roundtrip_and_delete() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("keys.redb")).unwrap();
        let options = ItemOptions::new("svc");

        store.set_item("k", "v", &options).await.unwrap();
        assert_eq!(store.get_item("k", &options).await.unwrap().as_deref(), Some("v"));

        store.delete_item("k", &options).await.unwrap();
        assert_eq!(store.get_item("k", &options).await.unwrap(), None);

        // Absent delete is fine
        store.delete_item("k", &options).await.unwrap();
    }

    #[tokio::test]
    async fn redb_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keys.redb");
        let options = ItemOptions::new("svc");

        {
            let store = RedbStore::open(&path).unwrap();
            store.set_item("k", "persisted", &options).await.unwrap();
        }

        let reopened = RedbStore::open(&path).unwrap();
        assert_eq!(reopened.get_item("k", &options).await.unwrap().as_deref(), Some("persisted"));
    }
}
