//! Credential store error types.
//!
//! - `Io`: underlying storage system failed (file system, database, keychain
//!   daemon)
//! - `Denied`: platform refused access (entitlement, locked keychain)
//! - `Serialization`: stored bytes could not be encoded/decoded

use thiserror::Error;

/// Errors that can occur during credential store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Access refused by the platform
    #[error("access denied: {0}")]
    Denied(String),

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StoreError::Denied(err.to_string()),
            _ => StoreError::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_maps_to_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        assert_eq!(StoreError::from(err), StoreError::Denied("locked".to_string()));
    }
}
