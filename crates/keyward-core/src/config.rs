//! Key manager configuration.

use std::time::Duration;

/// Default credential store namespace.
pub const DEFAULT_SERVICE: &str = "com.keyward.encryption";

/// Default age after which a key is rotated (7 days).
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_millis(7 * 24 * 60 * 60 * 1000);

/// Default number of superseded keys kept for migration.
pub const DEFAULT_RETAINED_KEYS: usize = 2;

/// Configuration for [`KeyManager`](crate::KeyManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyManagerConfig {
    /// Credential store namespace. Distinct applications must use distinct
    /// values so their entries cannot collide.
    pub service: String,

    /// Keys strictly older than this are rotated on the next request.
    pub rotation_interval: Duration,

    /// Number of superseded keys retained after rotation, newest first.
    ///
    /// Zero gives single-slot replacement: the outgoing key is discarded.
    pub retained_keys: usize,

    /// Ask the store to gate reads behind user authentication.
    pub require_authentication: bool,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            retained_keys: DEFAULT_RETAINED_KEYS,
            require_authentication: false,
        }
    }
}

impl KeyManagerConfig {
    /// Rotation interval in milliseconds, saturating at `u64::MAX`.
    pub fn rotation_interval_millis(&self) -> u64 {
        u64::try_from(self.rotation_interval.as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_is_seven_days() {
        let config = KeyManagerConfig::default();
        assert_eq!(config.rotation_interval_millis(), 604_800_000);
        assert!(!config.require_authentication);
    }
}
