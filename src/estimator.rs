//! Adaptive round-trip-time estimation.
//!
//! [`RttEstimator`] smooths RTT samples into a stable estimate with an
//! exponentially weighted moving average:
//!
//! ```text
//! estimated = (1 − α) × estimated + α × sample,   α = 0.125
//! ```
//!
//! Sampling uses a single **landmark**: the first chunk transmitted in a
//! window send is timestamped, and the measurement completes when a
//! cumulative ACK moves past that chunk.  Only one landmark is outstanding at
//! a time, so retransmitted or already-acknowledged chunks never contaminate
//! a sample.
//!
//! The estimate feeds the sender's retransmission deadline as
//! `2 × estimated` when adaptive timing is enabled.

use std::fmt;
use std::time::{Duration, Instant};

/// EWMA smoothing factor.
const ALPHA: f64 = 0.125;

/// Estimate used before the first sample arrives.
const INITIAL_RTT: Duration = Duration::from_millis(500);

/// One completed RTT measurement, ready for the trace log.
#[derive(Debug, Clone, Copy)]
pub struct RttSample {
    /// Measured round-trip time.
    pub sample: Duration,
    /// Estimate after folding this sample in.
    pub estimated: Duration,
    /// `sample − previous estimate`, seconds (signed).
    pub deviation: f64,
    /// `new estimate − previous estimate`, seconds (signed).
    pub change: f64,
}

impl fmt::Display for RttSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RTT Sample: {:.2}ms | Estimated: {:.2}ms | Deviation: {:+.2}ms | Change: {:+.2}ms",
            self.sample.as_secs_f64() * 1000.0,
            self.estimated.as_secs_f64() * 1000.0,
            self.deviation * 1000.0,
            self.change * 1000.0,
        )
    }
}

/// Exponentially weighted RTT tracker with a single landmark sample.
#[derive(Debug)]
pub struct RttEstimator {
    /// Current estimate in seconds.
    estimated: f64,
    /// Chunk index and send time of the measurement in flight.
    landmark: Option<(u32, Instant)>,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RttEstimator {
    pub fn new() -> Self {
        Self {
            estimated: INITIAL_RTT.as_secs_f64(),
            landmark: None,
        }
    }

    /// Current smoothed estimate.
    pub fn estimated(&self) -> Duration {
        Duration::from_secs_f64(self.estimated)
    }

    /// Retransmission deadline derived from the estimate (`2 × estimated`).
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.estimated * 2.0)
    }

    /// Arm a landmark on a freshly transmitted chunk.
    ///
    /// No-op while a measurement is already outstanding; the caller invokes
    /// this for every first transmission and the estimator keeps at most one.
    pub fn arm(&mut self, seq: u32, sent_at: Instant) {
        if self.landmark.is_none() {
            self.landmark = Some((seq, sent_at));
        }
    }

    /// Feed a cumulative ACK.
    ///
    /// When the ACK moves past the landmark chunk, completes the measurement:
    /// updates the estimate, clears the landmark (a new one may be armed on
    /// the next window send), and returns the sample for logging.
    pub fn on_ack(&mut self, ack: u32, now: Instant) -> Option<RttSample> {
        let (seq, sent_at) = self.landmark?;
        if ack <= seq {
            return None;
        }
        self.landmark = None;

        let sample = now.duration_since(sent_at);
        let previous = self.estimated;
        let deviation = sample.as_secs_f64() - previous;
        self.estimated = (1.0 - ALPHA) * previous + ALPHA * sample.as_secs_f64();

        Some(RttSample {
            sample,
            estimated: self.estimated(),
            deviation,
            change: self.estimated - previous,
        })
    }
}
