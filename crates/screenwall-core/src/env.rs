//! Environment abstraction for deterministic testing.
//!
//! Decouples server logic from system resources (time, randomness). Enables
//! deterministic simulation with turmoil (virtual clock, seeded RNG) and
//! production use with real system resources.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses OS entropy in production and a seeded generator in
///   simulation
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`, simulation uses
    /// `tokio::time::Instant` so turmoil controls the clock.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only runtime code awaits this; the coordinator never does.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for session ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
