//! Periodic grid power sampling.
//!
//! The [`Sampler`] asks a [`PowerMeter`] for the current value and publishes
//! successful readings to the shared [`GridCell`]. Any failure leaves the cell
//! untouched, so the display keeps showing the last good value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::{GridCell, GridPower, MeterError};

/// Interval between samples
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(3);

/// Source of grid power readings.
///
/// Implemented by the firmware over HTTP; tests use in-memory fakes.
pub trait PowerMeter {
    /// Take one reading. Blocking; bounded by the implementation's timeouts.
    fn read(&mut self) -> Result<GridPower, MeterError>;
}

impl<M: PowerMeter + ?Sized> PowerMeter for Box<M> {
    fn read(&mut self) -> Result<GridPower, MeterError> {
        (**self).read()
    }
}

/// What a single sampling attempt did.
#[derive(Debug)]
pub enum SampleOutcome {
    /// The value was read and published
    Published(GridPower),
    /// No request was made because the network link is down
    LinkDown,
    /// The request or parse failed; the cell keeps its previous value
    Failed(MeterError),
}

impl SampleOutcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

pub struct Sampler<M> {
    meter: M,
    cell: Arc<GridCell>,
}

impl<M: PowerMeter> Sampler<M> {
    pub fn new(meter: M, cell: Arc<GridCell>) -> Self {
        Self { meter, cell }
    }

    /// The cell this sampler publishes to
    #[must_use]
    pub fn cell(&self) -> &Arc<GridCell> {
        &self.cell
    }

    /// Take one sample.
    ///
    /// With the link down no request is made. On success the value is
    /// published; on any error the previous value stays in place.
    pub fn sample(&mut self, link_up: bool) -> SampleOutcome {
        if !link_up {
            let stale = self.staleness();
            warn!("Network down, keeping last reading{stale}");
            return SampleOutcome::LinkDown;
        }

        match self.meter.read() {
            Ok(power) => {
                self.cell.publish(power);
                info!("grid: {power}");
                SampleOutcome::Published(power)
            }
            Err(e) => {
                let stale = self.staleness();
                error!("Grid power sample failed: {e}{stale}");
                SampleOutcome::Failed(e)
            }
        }
    }

    fn staleness(&self) -> String {
        match self.cell.reading().age(Instant::now()) {
            Some(age) => format!(" (last good {}s ago)", age.as_secs()),
            None => String::from(" (no reading yet)"),
        }
    }
}

/// Fixed-interval trigger for the sampling loop.
///
/// Fires on the first check, then whenever at least `interval` has passed
/// since it last fired.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl Cadence {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a tick is due at `now`; if so, records `now` as the tick time.
    pub fn ready(&mut self, now: Instant) -> bool {
        let due = self
            .last_tick
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if due {
            self.last_tick = Some(now);
        }
        due
    }

    /// How long until the next tick is due (zero if already due).
    #[must_use]
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.last_tick.map_or(Duration::ZERO, |last| {
            self.interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(SAMPLE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use crate::parse_grid_power;

    /// Replays canned results and counts reads
    struct FakeMeter {
        results: VecDeque<Result<GridPower, MeterError>>,
        reads: usize,
    }

    impl FakeMeter {
        fn new(results: impl IntoIterator<Item = Result<GridPower, MeterError>>) -> Self {
            Self {
                results: results.into_iter().collect(),
                reads: 0,
            }
        }
    }

    impl PowerMeter for FakeMeter {
        fn read(&mut self) -> Result<GridPower, MeterError> {
            self.reads += 1;
            self.results
                .pop_front()
                .unwrap_or(Err(MeterError::Transport("no more results".into())))
        }
    }

    fn watts(w: f32) -> GridPower {
        GridPower::from_watts(w)
    }

    #[test]
    fn test_publishes_successful_read() {
        let cell = Arc::new(GridCell::new());
        let mut sampler = Sampler::new(FakeMeter::new([Ok(watts(-1500.0))]), Arc::clone(&cell));

        let outcome = sampler.sample(true);
        assert!(matches!(outcome, SampleOutcome::Published(p) if p == watts(-1500.0)));
        assert_eq!(cell.snapshot(), watts(-1500.0));
        assert!(cell.reading().updated_at.is_some());
    }

    #[test]
    fn test_link_down_skips_request() {
        let cell = Arc::new(GridCell::new());
        cell.publish(watts(800.0));
        let mut sampler = Sampler::new(FakeMeter::new([Ok(watts(1.0))]), Arc::clone(&cell));

        assert!(matches!(sampler.sample(false), SampleOutcome::LinkDown));
        assert_eq!(sampler.meter.reads, 0);
        assert_eq!(cell.snapshot(), watts(800.0));
    }

    #[test]
    fn test_failure_keeps_previous_value() {
        let cell = Arc::new(GridCell::new());
        let meter = FakeMeter::new([
            Ok(watts(-2000.0)),
            Err(MeterError::Status(503)),
            Err(MeterError::Transport("connection refused".into())),
            Err(MeterError::MissingField),
            Ok(watts(150.0)),
        ]);
        let mut sampler = Sampler::new(meter, Arc::clone(&cell));

        assert!(sampler.sample(true).is_published());
        let published_at = cell.reading().updated_at;
        for _ in 0..3 {
            assert!(matches!(sampler.sample(true), SampleOutcome::Failed(_)));
            assert_eq!(cell.snapshot(), watts(-2000.0));
            assert_eq!(cell.reading().updated_at, published_at);
        }
        assert!(sampler.sample(true).is_published());
        assert_eq!(cell.snapshot(), watts(150.0));
        assert_eq!(sampler.meter.reads, 5);
    }

    #[test]
    fn test_malformed_body_keeps_previous_value() {
        let cell = Arc::new(GridCell::new());
        cell.publish(watts(42.0));
        let meter = FakeMeter::new([parse_grid_power(b"<html>oops</html>")]);
        let mut sampler = Sampler::new(meter, Arc::clone(&cell));

        assert!(matches!(
            sampler.sample(true),
            SampleOutcome::Failed(MeterError::Parse(_))
        ));
        assert_eq!(cell.snapshot(), watts(42.0));
    }

    #[test]
    fn test_boxed_meter() {
        let cell = Arc::new(GridCell::new());
        let meter: Box<dyn PowerMeter> = Box::new(FakeMeter::new([Ok(watts(7.0))]));
        let mut sampler = Sampler::new(meter, Arc::clone(&cell));
        assert!(sampler.sample(true).is_published());
        assert_eq!(sampler.cell().snapshot(), watts(7.0));
    }

    #[test]
    fn test_cadence_fires_immediately_then_every_interval() {
        let start = Instant::now();
        let mut cadence = Cadence::default();
        assert_eq!(cadence.interval(), Duration::from_secs(3));
        assert_eq!(cadence.time_until_due(start), Duration::ZERO);

        assert!(cadence.ready(start));
        assert!(!cadence.ready(start + Duration::from_millis(10)));
        assert!(!cadence.ready(start + Duration::from_millis(2999)));
        assert_eq!(
            cadence.time_until_due(start + Duration::from_secs(1)),
            Duration::from_secs(2)
        );
        assert!(cadence.ready(start + Duration::from_secs(3)));
        // Next tick is measured from when the previous one fired
        assert!(!cadence.ready(start + Duration::from_secs(5)));
        assert!(cadence.ready(start + Duration::from_secs(6)));
    }

    #[test]
    fn test_cadence_after_long_stall() {
        let start = Instant::now();
        let mut cadence = Cadence::new(Duration::from_secs(3));
        assert!(cadence.ready(start));
        // A slow request does not cause a burst of catch-up ticks
        assert!(cadence.ready(start + Duration::from_secs(20)));
        assert!(!cadence.ready(start + Duration::from_secs(21)));
        assert_eq!(
            cadence.time_until_due(start + Duration::from_secs(30)),
            Duration::ZERO
        );
    }
}
