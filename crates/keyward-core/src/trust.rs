//! Runtime trust classification.
//!
//! Decides whether the secure credential store can be relied on to persist
//! key material. Simulators and some emulator images hand out keychains that
//! vanish or misbehave, so keys there are ephemeral.

/// Environment variable consulted by [`Deployment::detect`].
pub const DEPLOYMENT_ENV_VAR: &str = "KEYWARD_DEPLOYMENT";

/// Classifies the current runtime as trusted or not for durable secrets.
pub trait TrustClassifier: Send + Sync + 'static {
    /// `true` when the secure store is expected to persist correctly.
    fn is_trusted_environment(&self) -> bool;
}

/// Kind of runtime the process is deployed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deployment {
    /// Physical device or production host. Secure storage is trusted.
    #[default]
    Device,
    /// Development simulator or emulator. Keys are never persisted.
    Simulator,
}

impl Deployment {
    /// Classify the process from `KEYWARD_DEPLOYMENT`.
    ///
    /// `simulator` and `emulator` (case-insensitive) select
    /// [`Deployment::Simulator`]; anything else, including an unset variable,
    /// selects [`Deployment::Device`].
    pub fn detect() -> Self {
        std::env::var(DEPLOYMENT_ENV_VAR).map_or(Self::Device, |value| Self::parse(&value))
    }

    /// Classify from a raw label.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulator" | "emulator" => Self::Simulator,
            _ => Self::Device,
        }
    }
}

impl TrustClassifier for Deployment {
    fn is_trusted_environment(&self) -> bool {
        matches!(self, Self::Device)
    }
}
