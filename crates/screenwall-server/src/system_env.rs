//! Production environment: system clock, tokio timers, OS randomness.

use std::time::Duration;

use screenwall_core::Environment;

/// Production environment.
///
/// Session ids come from getrandom so they cannot be guessed by other
/// clients; everything else in the process only needs a monotonic clock.
///
/// # Panics
///
/// Panics if the OS RNG fails. Without it the server cannot hand out
/// unguessable session ids.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
