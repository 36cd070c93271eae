//! Latest grid power reading, shared between the sampler and the renderer.
//!
//! One writer and one reader exchange a single small value, so a mutex around
//! a `Copy` reading is enough: the critical section is a copy in either
//! direction and a reader can never see a half-written value. Readers may miss
//! intermediate values; only the most recent publish is kept.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::GridPower;

/// A published value and when it was published.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub power: GridPower,
    /// `None` until the first publish
    pub updated_at: Option<Instant>,
}

impl Reading {
    /// Time since the last publish, or `None` if nothing was published yet.
    #[must_use]
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.updated_at
            .map(|at| now.saturating_duration_since(at))
    }
}

/// Single-cell store for the most recent [`GridPower`].
///
/// Starts at zero watts. Shared as `Arc<GridCell>`.
#[derive(Debug, Default)]
pub struct GridCell {
    reading: Mutex<Reading>,
}

impl GridCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored value.
    pub fn publish(&self, power: GridPower) {
        self.publish_at(power, Instant::now());
    }

    /// Replace the stored value, recording `at` as its publish time.
    pub fn publish_at(&self, power: GridPower, at: Instant) {
        *self.lock() = Reading {
            power,
            updated_at: Some(at),
        };
    }

    /// The most recently published value (zero before the first publish).
    #[must_use]
    pub fn snapshot(&self) -> GridPower {
        self.lock().power
    }

    /// The most recently published value together with its publish time.
    #[must_use]
    pub fn reading(&self) -> Reading {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Reading> {
        // A panic while holding the lock cannot leave a torn `Copy` value
        self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
