//! Keyward: local encryption key lifecycle.
//!
//! Generates, persists, rotates and retires the symmetric key that protects
//! an embedded encrypted key-value store. The key lives in a secure credential
//! store (platform keychain/keystore); this crate decides when to create it,
//! when it is too old, and what to do when the store misbehaves.
//!
//! # Components
//!
//! - [`KeyManager`]: lifecycle orchestration (get-or-create, rotate, clear)
//! - [`CredentialStore`]: async store contract, with [`MemoryStore`],
//!   [`ChaoticStore`] and [`RedbStore`] backends
//! - [`Environment`]: wall clock and secure randomness ([`SystemEnv`] in
//!   production)
//! - [`TrustClassifier`]: whether the runtime may persist secrets
//!   ([`Deployment`])
//!
//! # Lifecycle
//!
//! ```text
//! [NO KEY] --get_or_create_key--> [ACTIVE v1]
//! [ACTIVE vN] --age > interval | force_key_rotation--> [ACTIVE vN+1]
//! [ACTIVE vN] --clear_all_keys--> [NO KEY]
//! [ACTIVE vN] --storage failure--> ephemeral key, store still at vN
//! ```
//!
//! # Security
//!
//! - Key material never appears in logs or error messages
//! - No fallback to a non-cryptographic RNG; an unavailable random source is
//!   an error
//! - Key bytes are zeroized on drop

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod key;
pub mod manager;
pub mod retention;
pub mod store;
mod system_env;
pub mod trust;

pub use config::KeyManagerConfig;
#[cfg(feature = "diagnostics")]
pub use diagnostics::Diagnostics;
pub use env::{EntropyError, Environment};
pub use error::KeyError;
pub use key::{KEY_LEN, KeyMaterial};
pub use manager::{ClearReport, KeyAge, KeyInfo, KeyManager};
pub use retention::RetiredKey;
pub use store::{
    ChaoticStore, CredentialStore, FaultScope, ItemOptions, MemoryStore, RedbStore, StoreError,
};
pub use system_env::SystemEnv;
pub use trust::{Deployment, TrustClassifier};
