//! Grid power sampling for GridBar
//!
//! This library provides the measurement side of the display: the
//! [`GridPower`] value, the [`GridCell`] shared between the sampling and
//! render threads, the Fronius Solar API response model, and the [`Sampler`]
//! that drives a [`PowerMeter`] on a fixed cadence. Transport is abstracted
//! behind [`PowerMeter`] so everything here runs on the host.

pub mod cell;
pub mod connection;
pub mod error;
pub mod fronius;
pub mod sampler;

use derive_more::Display;

pub use cell::{GridCell, Reading};
pub use connection::ConnectionSlot;
pub use error::MeterError;
pub use fronius::{meter_url, parse_grid_power, read_body};
pub use sampler::{Cadence, PowerMeter, SampleOutcome, Sampler, SAMPLE_INTERVAL};

/// Signed real power at the grid coupling point, in watts.
///
/// Negative values are export (the house feeds the grid), zero and positive
/// values are import.
#[derive(Debug, Display, Clone, Copy, PartialEq, PartialOrd, Default)]
#[display("{_0:.1} W")]
pub struct GridPower(f32);

impl GridPower {
    pub const ZERO: Self = Self(0.0);

    #[must_use]
    pub const fn from_watts(watts: f32) -> Self {
        Self(watts)
    }

    #[must_use]
    pub const fn watts(self) -> f32 {
        self.0
    }

    /// Whether power flows from the house into the grid (zero counts as export).
    #[must_use]
    pub fn is_export(self) -> bool {
        self.0 <= 0.0
    }

    /// Absolute power in watts, regardless of direction.
    #[must_use]
    pub fn magnitude(self) -> f32 {
        self.0.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction() {
        assert!(GridPower::from_watts(-250.0).is_export());
        assert!(GridPower::ZERO.is_export());
        assert!(!GridPower::from_watts(12.5).is_export());
        assert_eq!(GridPower::from_watts(-250.0).magnitude(), 250.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(GridPower::from_watts(-1234.56).to_string(), "-1234.6 W");
        assert_eq!(GridPower::ZERO.to_string(), "0.0 W");
    }
}
