//! Key lifecycle error types.
//!
//! None of these carry key material. Store field names are included so a log
//! line says which entry failed without saying what it held.

use thiserror::Error;

use crate::{env::EntropyError, store::StoreError};

/// Errors from key lifecycle operations
#[derive(Debug, Error)]
pub enum KeyError {
    /// The credential store rejected a write
    #[error("secure store rejected write of {field}: {source}")]
    StorageWrite {
        /// Store entry being written
        field: &'static str,
        /// Backend error
        #[source]
        source: StoreError,
    },

    /// The credential store failed a read
    #[error("secure store read of {field} failed: {source}")]
    StorageRead {
        /// Store entry being read
        field: &'static str,
        /// Backend error
        #[source]
        source: StoreError,
    },

    /// Persisting a freshly rotated key failed
    ///
    /// The previous key may already be partially overwritten; callers treat
    /// this as total failure.
    #[error("rotation to version {version} failed writing {field}: {source}")]
    Rotation {
        /// Version the rotation was trying to install
        version: u32,
        /// Store entry whose write failed
        field: &'static str,
        /// Backend error
        #[source]
        source: StoreError,
    },

    /// The secure random source is unavailable
    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(#[source] EntropyError),

    /// A stored entry did not decode to a key
    #[error("stored {field} is malformed")]
    MalformedKey {
        /// Store entry that failed to decode
        field: &'static str,
    },

    /// The version counter cannot advance further
    #[error("key version overflow at {current}")]
    VersionOverflow {
        /// Version when overflow was detected
        current: u32,
    },
}

impl KeyError {
    /// Returns true if an ephemeral key is an acceptable substitute
    ///
    /// Storage faults are recoverable: a fresh unpersisted key keeps the
    /// application running. Without secure randomness no key can be produced
    /// at all.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::StorageWrite { .. }
            | Self::StorageRead { .. }
            | Self::Rotation { .. }
            | Self::MalformedKey { .. }
            | Self::VersionOverflow { .. } => true,

            Self::RandomSourceUnavailable(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_recoverable() {
        let err = KeyError::StorageWrite {
            field: "encryption_key",
            source: StoreError::Io("disk full".to_string()),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_entropy_is_not_recoverable() {
        let err = KeyError::RandomSourceUnavailable(EntropyError("gone".to_string()));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn error_display() {
        let err = KeyError::Rotation {
            version: 4,
            field: "encryption_key_version",
            source: StoreError::Denied("entitlement mismatch".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "rotation to version 4 failed writing encryption_key_version: access denied: \
             entitlement mismatch"
        );
    }
}
