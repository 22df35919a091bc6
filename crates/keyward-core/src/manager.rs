//! Encryption key lifecycle.
//!
//! [`KeyManager`] owns one symmetric key per namespace: it creates the key on
//! first use, rotates it once it outlives the configured interval, keeps a
//! few superseded keys for migration, and destroys everything on request.
//!
//! The credential store is the only owner of key state. Nothing is cached in
//! memory between calls, so every operation re-reads the store.
//!
//! # Store layout
//!
//! ```text
//! encryption_key             base64 key material (32 bytes)
//! encryption_key_created_at  decimal milliseconds since the Unix epoch
//! encryption_key_version     decimal u32, starts at 1
//! encryption_key_retired     base64 CBOR list of superseded keys
//! ```
//!
//! # Failure policy
//!
//! [`KeyManager::get_or_create_key`] always yields a usable key unless the
//! secure random source is gone. Storage faults degrade to an ephemeral key
//! that is never written back, so the stored key is untouched and comes back
//! on the next successful call.
//!
//! The creation timestamp is the commit marker for the active slot. It is
//! removed before a new key is written and restored last, so a key whose
//! write stopped part way is never served as fresh and never retired.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::KeyManagerConfig,
    env::Environment,
    error::KeyError,
    key::KeyMaterial,
    retention::{RetiredKey, decode_retired, encode_retired, push_retired},
    store::{CredentialStore, ItemOptions},
    trust::TrustClassifier,
};

/// Store entry holding the base64 key material.
pub const KEY_FIELD: &str = "encryption_key";

/// Store entry holding the creation timestamp.
pub const CREATED_AT_FIELD: &str = "encryption_key_created_at";

/// Store entry holding the key version.
pub const VERSION_FIELD: &str = "encryption_key_version";

/// Store entry holding superseded keys.
pub const RETIRED_FIELD: &str = "encryption_key_retired";

/// Age of the stored key relative to the rotation interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAge {
    /// No creation timestamp is stored (or it does not parse).
    Missing,
    /// Within the rotation interval.
    Fresh {
        /// Milliseconds since creation.
        age_millis: u64,
    },
    /// Strictly older than the rotation interval.
    Stale {
        /// Milliseconds since creation.
        age_millis: u64,
    },
}

impl KeyAge {
    /// `true` for [`KeyAge::Missing`] and [`KeyAge::Stale`].
    pub fn needs_rotation(self) -> bool {
        !matches!(self, Self::Fresh { .. })
    }

    /// Milliseconds since creation, 0 when missing.
    pub fn age_millis(self) -> u64 {
        match self {
            Self::Missing => 0,
            Self::Fresh { age_millis } | Self::Stale { age_millis } => age_millis,
        }
    }
}

/// Diagnostic snapshot of the stored key. Never contains key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// A decodable key is stored.
    pub has_key: bool,
    /// Stored version, 0 if absent.
    pub version: u32,
    /// Milliseconds since creation, 0 if unknown.
    pub age_millis: u64,
    /// The next `get_or_create_key` would rotate.
    pub needs_rotation: bool,
    /// Versions of retained superseded keys, newest first.
    pub retained_versions: Vec<u32>,
}

/// Outcome of [`KeyManager::clear_all_keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Store entries whose deletion failed.
    pub failed: Vec<&'static str>,
}

impl ClearReport {
    /// Every entry was deleted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lifecycle manager for one encryption key.
///
/// # Concurrency
///
/// The decide-and-write sequences (`get_or_create_key`, `rotate`,
/// `clear_all_keys`) run under an async mutex, so overlapping callers sharing
/// one manager never rotate twice: the second caller waits and then finds the
/// freshly rotated key. Two managers over the same namespace do not share the
/// gate; use one manager per namespace per process.
pub struct KeyManager<E, T, S> {
    env: E,
    classifier: T,
    store: S,
    config: KeyManagerConfig,
    options: ItemOptions,
    rotation_gate: Mutex<()>,
}

impl<E, T, S> KeyManager<E, T, S>
where
    E: Environment,
    T: TrustClassifier,
    S: CredentialStore,
{
    /// Create a manager over `store`, namespaced by `config.service`.
    pub fn new(env: E, classifier: T, store: S, config: KeyManagerConfig) -> Self {
        let options = ItemOptions {
            service: config.service.clone(),
            require_authentication: config.require_authentication,
        };
        Self { env, classifier, store, config, options, rotation_gate: Mutex::new(()) }
    }

    /// Active configuration.
    pub fn config(&self) -> &KeyManagerConfig {
        &self.config
    }

    /// Underlying credential store.
    pub fn credential_store(&self) -> &S {
        &self.store
    }

    /// Generate 32 bytes of key material from the secure random source.
    ///
    /// Performs no I/O. Fails only if the random source is unavailable.
    pub fn generate_key(&self) -> Result<KeyMaterial, KeyError> {
        KeyMaterial::generate(&self.env)
    }

    /// Persist `material` as the active key at `version`, stamped now.
    ///
    /// Clears the creation timestamp, then writes material, version and
    /// timestamp as separate store writes. A failure part way leaves earlier
    /// writes in place but no timestamp, so the slot reads as needing
    /// rotation; callers treat any error as total failure.
    pub async fn store_key(&self, material: &KeyMaterial, version: u32) -> Result<(), KeyError> {
        let created_at = self.env.wall_clock_millis();

        self.store
            .delete_item(CREATED_AT_FIELD, &self.options)
            .await
            .map_err(|source| KeyError::StorageWrite { field: CREATED_AT_FIELD, source })?;
        self.write(KEY_FIELD, &material.to_base64()).await?;
        self.write(VERSION_FIELD, &version.to_string()).await?;
        self.write(CREATED_AT_FIELD, &created_at.to_string()).await?;

        debug!(version, created_at, "encryption key stored");
        Ok(())
    }

    /// Stored key material, or `None` if absent.
    ///
    /// Read failures and undecodable values also yield `None`.
    pub async fn retrieve(&self) -> Option<KeyMaterial> {
        match self.retrieve_checked().await {
            Ok(key) => key,
            Err(err) => {
                warn!(error = %err, "key read failed, treating key as absent");
                None
            },
        }
    }

    /// Stored key material, distinguishing read failure from absence.
    pub async fn retrieve_checked(&self) -> Result<Option<KeyMaterial>, KeyError> {
        match self.read(KEY_FIELD).await? {
            Some(encoded) => KeyMaterial::from_base64(&encoded, KEY_FIELD).map(Some),
            None => Ok(None),
        }
    }

    /// Stored version, 0 if missing, unparseable or unreadable.
    pub async fn retrieve_version(&self) -> u32 {
        self.read_version_checked().await.unwrap_or_else(|err| {
            warn!(error = %err, "version read failed, assuming no prior version");
            0
        })
    }

    /// Age of the stored key, distinguishing read failure.
    ///
    /// A creation timestamp in the future counts as age 0.
    pub async fn key_age(&self) -> Result<KeyAge, KeyError> {
        let Some(raw) = self.read(CREATED_AT_FIELD).await? else {
            return Ok(KeyAge::Missing);
        };
        let Ok(created_at) = raw.trim().parse::<u64>() else {
            warn!(field = CREATED_AT_FIELD, "unparseable creation timestamp, treating as missing");
            return Ok(KeyAge::Missing);
        };

        let age_millis = self.env.wall_clock_millis().saturating_sub(created_at);
        if age_millis > self.config.rotation_interval_millis() {
            Ok(KeyAge::Stale { age_millis })
        } else {
            Ok(KeyAge::Fresh { age_millis })
        }
    }

    /// `true` if the key is missing, stale, or its age cannot be read.
    pub async fn needs_rotation(&self) -> bool {
        match self.key_age().await {
            Ok(age) => age.needs_rotation(),
            Err(err) => {
                warn!(error = %err, "key age unreadable, rotating to be safe");
                true
            },
        }
    }

    /// Replace the active key with a new one at the next version.
    ///
    /// The outgoing key joins the retained list when retention is enabled.
    /// An unreadable version fails the rotation instead of restarting the
    /// sequence at 1.
    pub async fn rotate(&self) -> Result<KeyMaterial, KeyError> {
        let _gate = self.rotation_gate.lock().await;
        let current = self.read_version_checked().await?;
        self.rotate_locked(current).await
    }

    /// Rotate regardless of key age.
    ///
    /// Administrative operation; routine callers use
    /// [`get_or_create_key`](Self::get_or_create_key).
    pub async fn force_key_rotation(&self) -> Result<KeyMaterial, KeyError> {
        info!("forced key rotation requested");
        self.rotate().await
    }

    /// The current encryption key, creating or rotating it as needed.
    ///
    /// In an untrusted environment a fresh key is returned every call and
    /// nothing is persisted. In a trusted environment storage faults fall back
    /// to an unpersisted key. The only error is an unavailable random source.
    pub async fn get_or_create_key(&self) -> Result<KeyMaterial, KeyError> {
        if !self.classifier.is_trusted_environment() {
            debug!("untrusted environment, issuing ephemeral key");
            return self.generate_key();
        }

        match self.get_or_create_persisted().await {
            Ok(key) => Ok(key),
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "secure storage failed, falling back to ephemeral key");
                self.generate_key()
            },
            Err(err) => Err(err),
        }
    }

    /// Delete every stored entry (key, timestamp, version, retained keys).
    ///
    /// Best effort: each entry is deleted independently and failures are
    /// logged and reported, never raised.
    pub async fn clear_all_keys(&self) -> ClearReport {
        let _gate = self.rotation_gate.lock().await;

        let mut report = ClearReport::default();
        for field in [KEY_FIELD, CREATED_AT_FIELD, VERSION_FIELD, RETIRED_FIELD] {
            if let Err(err) = self.store.delete_item(field, &self.options).await {
                warn!(field, error = %err, "failed to delete key entry");
                report.failed.push(field);
            }
        }

        if report.is_complete() {
            info!("all key entries cleared");
        }
        report
    }

    /// Diagnostic snapshot. Every sub-read defaults independently, so this
    /// never fails.
    pub async fn get_key_info(&self) -> KeyInfo {
        let has_key = self.retrieve().await.is_some();
        let version = self.retrieve_version().await;
        let (age_millis, needs_rotation) = match self.key_age().await {
            Ok(age) => (age.age_millis(), age.needs_rotation()),
            Err(err) => {
                warn!(error = %err, "key age unreadable");
                (0, true)
            },
        };
        let retained_versions = self.retained_keys().await.iter().map(|k| k.version).collect();

        KeyInfo { has_key, version, age_millis, needs_rotation, retained_versions }
    }

    /// Retained superseded keys, newest first. Empty if unreadable.
    pub async fn retained_keys(&self) -> Vec<RetiredKey> {
        self.load_retired().await.unwrap_or_else(|err| {
            warn!(error = %err, "retained keys unreadable");
            Vec::new()
        })
    }

    /// Key that was active as `version`, retained or current.
    ///
    /// A retained entry wins over the active slot: after an interrupted
    /// rotation the slot can hold an unissued key under the old version.
    pub async fn key_for_version(&self, version: u32) -> Option<KeyMaterial> {
        if version == 0 {
            return None;
        }
        let retained = self
            .retained_keys()
            .await
            .into_iter()
            .find(|retired| retired.version == version)
            .map(|retired| retired.material);
        if retained.is_some() {
            return retained;
        }
        if self.retrieve_version().await == version {
            return self.retrieve().await;
        }
        None
    }

    async fn get_or_create_persisted(&self) -> Result<KeyMaterial, KeyError> {
        let _gate = self.rotation_gate.lock().await;

        let age = self.key_age().await?;
        if age.needs_rotation() {
            debug!(?age, "key missing or stale");
            let current = self.read_version_checked().await?;
            return self.rotate_locked(current).await;
        }

        match self.retrieve_checked().await {
            Ok(Some(key)) => return Ok(key),
            Ok(None) => {},
            Err(KeyError::MalformedKey { field }) => {
                warn!(field, "stored key is malformed, replacing it");
            },
            Err(err) => return Err(err),
        }

        // Metadata survived but the material did not. Continue the version
        // sequence instead of restarting it.
        let current = self.read_version_checked().await?;
        let version = next_version(current)?;
        let key = self.generate_key()?;
        self.store_key(&key, version).await?;

        info!(version, "encryption key recreated after material loss");
        Ok(key)
    }

    async fn rotate_locked(&self, current: u32) -> Result<KeyMaterial, KeyError> {
        let version = next_version(current)?;
        let key = self.generate_key()?;

        self.retire_current(current).await;

        self.store_key(&key, version).await.map_err(|err| match err {
            KeyError::StorageWrite { field, source } => KeyError::Rotation { version, field, source },
            other => other,
        })?;

        info!(version, "encryption key rotated");
        Ok(key)
    }

    /// Move the active key into the retained list. Failures only cost the
    /// ability to decrypt old data, so they are logged and swallowed.
    ///
    /// Only a committed key with a known version is retained. A slot without
    /// a creation timestamp holds a key that was never issued (or is being
    /// cleared), and version 0 could never be looked up again.
    async fn retire_current(&self, version: u32) {
        let capacity = self.config.retained_keys;
        if capacity == 0 || version == 0 {
            return;
        }

        match self.read(CREATED_AT_FIELD).await {
            Ok(Some(_)) => {},
            Ok(None) => {
                debug!(version, "active key was never committed, not retaining it");
                return;
            },
            Err(err) => {
                warn!(error = %err, "creation timestamp unreadable, not retaining key");
                return;
            },
        }

        let outgoing = match self.retrieve_checked().await {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "outgoing key unreadable, not retaining it");
                return;
            },
        };

        let mut retired = match self.load_retired().await {
            Ok(retired) => retired,
            Err(err) => {
                warn!(error = %err, "retained keys unreadable, leaving them untouched");
                return;
            },
        };

        push_retired(
            &mut retired,
            RetiredKey {
                version,
                retired_at_millis: self.env.wall_clock_millis(),
                material: outgoing,
            },
            capacity,
        );

        let stored = match encode_retired(&retired) {
            Ok(encoded) => self.write(RETIRED_FIELD, &encoded).await,
            Err(source) => Err(KeyError::StorageWrite { field: RETIRED_FIELD, source }),
        };
        match stored {
            Ok(()) => debug!(version, retained = retired.len(), "outgoing key retained"),
            Err(err) => warn!(error = %err, version, "failed to retain outgoing key"),
        }
    }

    async fn load_retired(&self) -> Result<Vec<RetiredKey>, KeyError> {
        match self.read(RETIRED_FIELD).await? {
            Some(encoded) => decode_retired(&encoded)
                .map_err(|source| KeyError::StorageRead { field: RETIRED_FIELD, source }),
            None => Ok(Vec::new()),
        }
    }

    async fn read_version_checked(&self) -> Result<u32, KeyError> {
        let Some(raw) = self.read(VERSION_FIELD).await? else {
            return Ok(0);
        };
        Ok(raw.trim().parse::<u32>().unwrap_or_else(|_| {
            warn!(field = VERSION_FIELD, "unparseable key version, assuming no prior version");
            0
        }))
    }

    async fn read(&self, field: &'static str) -> Result<Option<String>, KeyError> {
        self.store
            .get_item(field, &self.options)
            .await
            .map_err(|source| KeyError::StorageRead { field, source })
    }

    async fn write(&self, field: &'static str, value: &str) -> Result<(), KeyError> {
        self.store
            .set_item(field, value, &self.options)
            .await
            .map_err(|source| KeyError::StorageWrite { field, source })
    }
}

fn next_version(current: u32) -> Result<u32, KeyError> {
    current.checked_add(1).ok_or(KeyError::VersionOverflow { current })
}
