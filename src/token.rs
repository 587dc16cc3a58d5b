//! Short random identifiers used to name archives and their entries.
//!
//! A single process-wide [`StdRng`] is seeded once from OS entropy on first use and
//! then shared behind a mutex. It is never reseeded per call, so concurrent dispatch
//! cycles draw from one stream instead of racing on a time-based seed.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Length of every generated token.
pub const TOKEN_LEN: usize = 10;

static GLOBAL: OnceLock<Mutex<TokenGenerator>> = OnceLock::new();

/// Generator of `[a-zA-Z0-9]{10}` tokens backed by its own RNG.
#[derive(Debug)]
pub struct TokenGenerator {
    rng: StdRng,
}

impl TokenGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator, mostly useful in tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_token(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect()
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a token from the process-wide generator.
pub fn generate() -> String {
    let lock = GLOBAL.get_or_init(|| Mutex::new(TokenGenerator::new()));
    // A panic while holding the lock cannot leave the RNG in a broken state.
    let mut guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    guard.next_token()
}
