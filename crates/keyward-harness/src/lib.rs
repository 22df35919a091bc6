//! Deterministic simulation harness for keyward.
//!
//! Provides [`SimEnv`], an [`Environment`] with a manual wall clock and a
//! seeded ChaCha RNG. Tests advance time explicitly ("eight days later") and
//! can switch the entropy source off to exercise the no-randomness path.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use keyward_core::{EntropyError, Environment};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// 2024-01-01T00:00:00Z, the default simulated start time.
pub const SIM_EPOCH_MILLIS: u64 = 1_704_067_200_000;

/// One simulated day.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Simulated environment with controllable time and seeded randomness.
///
/// Clones share the clock, RNG and entropy switch, so a test can keep one
/// handle while the manager owns another.
#[derive(Clone)]
pub struct SimEnv {
    now_millis: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha20Rng>>,
    entropy_available: Arc<AtomicBool>,
}

impl SimEnv {
    /// Create an environment at [`SIM_EPOCH_MILLIS`] with the given RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::at(SIM_EPOCH_MILLIS, seed)
    }

    /// Create an environment at an explicit wall-clock time.
    pub fn at(now_millis: u64, seed: u64) -> Self {
        Self {
            now_millis: Arc::new(AtomicU64::new(now_millis)),
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            entropy_available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Move the clock backward (clock skew, manual time change).
    pub fn rewind(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let now = self.now_millis.load(Ordering::SeqCst);
        self.now_millis.store(now.saturating_sub(millis), Ordering::SeqCst);
    }

    /// Make `random_bytes` fail (or succeed again).
    pub fn set_entropy_available(&self, available: bool) {
        self.entropy_available.store(available, Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    fn wall_clock_millis(&self) -> u64 {
        self.now_millis.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        if !self.entropy_available.load(Ordering::SeqCst) {
            return Err(EntropyError("simulated entropy outage".to_string()));
        }

        #[allow(clippy::expect_used)]
        self.rng.lock().expect("SimEnv RNG mutex poisoned").fill_bytes(buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(7);
        let b = SimEnv::with_seed(7);

        let mut bytes_a = [0u8; 32];
        let mut bytes_b = [0u8; 32];
        a.random_bytes(&mut bytes_a).unwrap();
        b.random_bytes(&mut bytes_b).unwrap();

        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn clones_share_clock() {
        let env = SimEnv::default();
        let handle = env.clone();

        handle.advance(DAY);
        assert_eq!(env.wall_clock_millis(), SIM_EPOCH_MILLIS + 86_400_000);

        handle.rewind(DAY * 2);
        assert_eq!(env.wall_clock_millis(), SIM_EPOCH_MILLIS - 86_400_000);
    }

    #[test]
    fn entropy_switch() {
        let env = SimEnv::default();
        env.set_entropy_available(false);

        let mut bytes = [0u8; 4];
        assert!(env.random_bytes(&mut bytes).is_err());

        env.set_entropy_available(true);
        assert!(env.random_bytes(&mut bytes).is_ok());
    }
}
