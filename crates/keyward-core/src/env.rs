//! Environment abstraction for deterministic testing.
//!
//! Decouples key lifecycle logic from system resources (wall clock,
//! randomness). Production code uses [`SystemEnv`](crate::SystemEnv); tests
//! use a simulated environment with a manual clock and seeded RNG.

use thiserror::Error;

/// The secure random source could not produce bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entropy source unavailable: {0}")]
pub struct EntropyError(pub String);

/// Abstract environment providing wall-clock time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `random_bytes()` never substitutes a weaker generator on failure; it
///   returns [`EntropyError`] instead
pub trait Environment: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    ///
    /// Key ages are computed from this value, so unlike a monotonic instant it
    /// must be comparable across process restarts.
    fn wall_clock_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - On error the buffer contents are unspecified and must not be used
    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;
}
