//! Chaotic credential store wrapper for fault injection testing
//!
//! Store wrapper that randomly fails operations to exercise the key manager's
//! fallback paths. A keychain can refuse a write (entitlement mismatch,
//! storage full) or a read (device locked) at any point, and the manager must
//! still hand the application a usable key.

use std::sync::{Arc, Mutex};

use super::{CredentialStore, ItemOptions, StoreError};

/// Which operations the chaotic wrapper may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultScope {
    /// Reads, writes and deletes
    #[default]
    All,
    /// Only `get_item`
    Reads,
    /// Only `set_item`
    Writes,
    /// Only `delete_item`
    Deletes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Write,
    Delete,
}

impl FaultScope {
    fn covers(self, operation: Operation) -> bool {
        match self {
            Self::All => true,
            Self::Reads => operation == Operation::Read,
            Self::Writes => operation == Operation::Write,
            Self::Deletes => operation == Operation::Delete,
        }
    }
}

/// Chaotic store wrapper that randomly injects failures
///
/// Delegates to an underlying store but fails operations in `scope` with
/// probability `failure_rate`. Operations outside the scope always reach the
/// inner store and do not consume randomness. Uses Arc<Mutex<>> for the RNG
/// state, making it Clone and thread-safe.
#[derive(Clone)]
pub struct ChaoticStore<S: CredentialStore> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    scope: FaultScope,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operation counter
    operation_count: Arc<Mutex<usize>>,
}

/// Simple deterministic RNG for chaos injection
///
/// Uses linear congruential generator (LCG) for fast, deterministic randomness.
/// This ensures chaos tests are reproducible with the same seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random value [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // LCG constants from Numerical Recipes
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }

    /// Check if we should fail (returns true with probability = `failure_rate`)
    fn should_fail(&mut self, failure_rate: f64) -> bool {
        self.next() < failure_rate
    }
}

impl<S: CredentialStore> ChaoticStore<S> {
    /// Create a new chaotic wrapper failing every kind of operation
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    #[allow(clippy::panic)]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            scope: FaultScope::All,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Restrict injected failures to one kind of operation.
    #[must_use]
    pub fn failing(mut self, scope: FaultScope) -> Self {
        self.scope = scope;
        self
    }

    /// Underlying store (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of store operations attempted.
    pub fn operation_count(&self) -> usize {
        #[allow(clippy::expect_used)]
        *self.operation_count.lock().expect("operation_count mutex poisoned")
    }

    fn increment_operation_count(&self) {
        #[allow(clippy::expect_used)]
        let mut count = self.operation_count.lock().expect("operation_count mutex poisoned");
        *count += 1;
    }

    /// Count the operation and decide whether it fails
    fn inject(&self, operation: Operation) -> Result<(), StoreError> {
        self.increment_operation_count();
        if !self.scope.covers(operation) {
            return Ok(());
        }

        #[allow(clippy::expect_used)]
        let fail =
            self.rng.lock().expect("ChaoticRng mutex poisoned").should_fail(self.failure_rate);
        if fail {
            return Err(StoreError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: CredentialStore> CredentialStore for ChaoticStore<S> {
    async fn set_item(
        &self,
        key: &str,
        value: &str,
        options: &ItemOptions,
    ) -> Result<(), StoreError> {
        self.inject(Operation::Write)?;
        self.inner.set_item(key, value, options).await
    }

    async fn get_item(&self, key: &str, options: &ItemOptions) -> Result<Option<String>, StoreError> {
        self.inject(Operation::Read)?;
        self.inner.get_item(key, options).await
    }

    async fn delete_item(&self, key: &str, options: &ItemOptions) -> Result<(), StoreError> {
        self.inject(Operation::Delete)?;
        self.inner.delete_item(key, options).await
    }
}
