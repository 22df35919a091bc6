//! Operator surface for inspecting and resetting key state.
//!
//! Compiled only with the `diagnostics` feature. A [`Diagnostics`] handle is
//! built explicitly from a manager and handed to whatever needs it (a debug
//! menu, an operator CLI), so release builds without the feature carry no
//! way to force rotation or wipe keys from outside the application flow.
//!
//! Nothing here returns key material.

use tracing::info;

use crate::{
    env::Environment,
    error::KeyError,
    manager::{ClearReport, KeyInfo, KeyManager},
    store::CredentialStore,
    trust::TrustClassifier,
};

/// Administrative handle over a [`KeyManager`].
pub struct Diagnostics<'a, E, T, S> {
    manager: &'a KeyManager<E, T, S>,
}

impl<'a, E, T, S> Diagnostics<'a, E, T, S>
where
    E: Environment,
    T: TrustClassifier,
    S: CredentialStore,
{
    /// Wrap `manager`.
    pub fn new(manager: &'a KeyManager<E, T, S>) -> Self {
        Self { manager }
    }

    /// Snapshot the key state and log it at info level.
    pub async fn log_key_info(&self) -> KeyInfo {
        let info = self.manager.get_key_info().await;
        info!(
            has_key = info.has_key,
            version = info.version,
            age_millis = info.age_millis,
            needs_rotation = info.needs_rotation,
            retained = ?info.retained_versions,
            "encryption key info"
        );
        info
    }

    /// Rotate now and report the resulting state.
    pub async fn force_rotation(&self) -> Result<KeyInfo, KeyError> {
        self.manager.force_key_rotation().await?;
        Ok(self.log_key_info().await)
    }

    /// Delete all key entries.
    pub async fn clear_keys(&self) -> ClearReport {
        let report = self.manager.clear_all_keys().await;
        info!(complete = report.is_complete(), failed = ?report.failed, "key entries cleared");
        report
    }
}
