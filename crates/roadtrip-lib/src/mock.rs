//! Simulated network behaviour for the mock backend
//!
//! Every backend call sleeps for a short, bounded, operation-dependent delay so
//! that callers always observe a real pending state. Failures can be injected
//! per repository to exercise error and retry paths.

use crate::{DataError, Result};
use rand::Rng;
use std::time::Duration;

/// Backend operations, grouped by how expensive the real call would be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Single record by id
    Get,
    /// Whole collection or a filtered subset
    List,
    Create,
    /// In-place modification of an existing record (e.g. adding an image)
    Update,
    Delete,
    /// Credential check during login
    Authenticate,
    /// Profile round-trip
    UpdateProfile,
}

impl Operation {
    /// Base delay range in milliseconds (inclusive)
    pub const fn base_range_ms(self) -> (u64, u64) {
        match self {
            Self::Get => (200, 300),
            Self::List => (300, 600),
            Self::Create => (500, 800),
            Self::Update => (300, 300),
            Self::Delete => (400, 500),
            Self::Authenticate => (800, 800),
            Self::UpdateProfile => (1000, 1000),
        }
    }
}

/// Latency model shared by every repository of a backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockLatency {
    /// Multiplier applied to every base range. 0 disables latency.
    pub scale: f64,
}

impl Default for MockLatency {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl MockLatency {
    /// No artificial delay at all
    pub const fn none() -> Self {
        Self { scale: 0.0 }
    }

    pub const fn scaled(scale: f64) -> Self {
        Self { scale }
    }

    /// Upper bound of the delay for an operation
    pub fn max_delay(&self, operation: Operation) -> Duration {
        let (_, max) = operation.base_range_ms();
        self.scale_ms(max)
    }

    /// Lower bound of the delay for an operation
    pub fn min_delay(&self, operation: Operation) -> Duration {
        let (min, _) = operation.base_range_ms();
        self.scale_ms(min)
    }

    /// Pick a delay within the operation's range
    pub fn delay_for(&self, operation: Operation) -> Duration {
        let (min, max) = operation.base_range_ms();
        let ms = rand::rng().random_range(min..=max);
        self.scale_ms(ms)
    }

    /// Sleep for a delay within the operation's range
    pub async fn sleep(&self, operation: Operation) {
        let delay = self.delay_for(operation);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Negative, non-finite or overflowing scales mean no delay
    fn scale_ms(&self, ms: u64) -> Duration {
        Duration::try_from_secs_f64(ms as f64 * self.scale / 1000.0).unwrap_or_default()
    }
}

/// Injected failure behaviour of a repository
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FailureMode {
    #[default]
    Never,
    Always,
    /// Fail each call independently with this probability (0.0 - 1.0).
    /// NaN never fails.
    Probability(f64),
}

impl FailureMode {
    /// Roll the dice for one call
    pub fn check(&self) -> Result<()> {
        let fail = match *self {
            Self::Never => false,
            Self::Always => true,
            Self::Probability(p) if p.is_nan() => false,
            Self::Probability(p) => rand::rng().random_bool(p.clamp(0.0, 1.0)),
        };
        if fail {
            Err(DataError::SimulatedFailure)
        } else {
            Ok(())
        }
    }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LENGTH: usize = 9;

/// Random client-side id: 9 lowercase base-36 characters
///
/// Uniqueness is probabilistic; repositories do not check it.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
