//! Metrics aggregator: turns raw per-feed counters into rate samples.

use std::time::{Instant, SystemTime};

use feedwatch_types::RateSample;
use parking_lot::Mutex;
use tracing::debug;

use crate::registry::Registry;

/// Periodic drain of every feed's counters.
///
/// All feeds in one cycle share the same elapsed time, measured from the
/// previous cycle. Cycles are serialised: a cycle holds the aggregator's
/// clock for its whole duration.
#[derive(Debug)]
pub struct Aggregator {
    previous: Mutex<Instant>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Aggregator {
    pub fn new(start: Instant) -> Self {
        Self {
            previous: Mutex::new(start),
        }
    }

    /// Restart the measurement window at `now`.
    pub fn reset(&self, now: Instant) {
        *self.previous.lock() = now;
    }

    /// Run one cycle ending at `now`.
    ///
    /// Returns the number of feeds that received a sample. A cycle with no
    /// elapsed time is skipped and leaves the counters untouched.
    pub fn run_cycle(&self, registry: &Registry, now: Instant) -> usize {
        let mut previous = self.previous.lock();
        let elapsed = now.saturating_duration_since(*previous);
        if elapsed.is_zero() {
            return 0;
        }

        let sampled_at = SystemTime::now();
        let mut sampled = 0;
        for feed in registry.feeds() {
            let counters = feed.drain(now);
            if let Some(sample) = RateSample::from_window(
                counters.message_count,
                counters.payload_bytes,
                elapsed,
                sampled_at,
            ) {
                feed.push_sample(sample);
                sampled += 1;
            }
        }

        *previous = now;
        debug!(feeds = sampled, elapsed = ?elapsed, "Aggregation cycle complete");
        sampled
    }
}
