//! Secure credential store abstraction
//!
//! Trait-based abstraction over a platform keychain/keystore. The key manager
//! only ever stores short strings under a fixed namespace, so the contract is
//! three string operations. Methods return `Send` futures without tying the
//! trait to a particular runtime.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::future::Future;

pub use chaotic::{ChaoticStore, FaultScope};
pub use error::StoreError;
pub use memory::MemoryStore;

pub use self::redb::RedbStore;

/// Per-item options forwarded to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOptions {
    /// Namespace the item lives under.
    pub service: String,
    /// Whether reads should require user authentication. Backends without
    /// an authentication prompt ignore this.
    pub require_authentication: bool,
}

impl ItemOptions {
    /// Options for `service` with authentication disabled.
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into(), require_authentication: false }
    }
}

/// Asynchronous credential store.
///
/// Must be Clone (shared between the manager and diagnostics), Send + Sync
/// and `'static`. Implementations share internal state via Arc, so clones
/// access the same underlying entries.
///
/// # Invariants
///
/// - Items are addressed by `(options.service, key)`; equal keys under
///   different services never alias
/// - Writes are not atomic across keys
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Store `value` under `key`, replacing any previous value.
    fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &ItemOptions,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Load the value under `key`.
    ///
    /// Returns `None` if nothing is stored.
    fn get_item(
        &self,
        key: &str,
        options: &ItemOptions,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Remove the value under `key`.
    ///
    /// Removing an absent item succeeds.
    fn delete_item(
        &self,
        key: &str,
        options: &ItemOptions,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
