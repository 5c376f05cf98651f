//! Throughput samples.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of rate samples kept per feed unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// One periodic measurement of a feed's throughput.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateSample {
    /// Messages per second over the window.
    pub message_rate: f64,

    /// Kilobytes (1024 bytes) of payload per second over the window.
    pub payload_rate_kbs: f64,

    /// Length of the window in seconds.
    pub window_secs: f64,

    /// Unix timestamp in milliseconds at the end of the window.
    pub sampled_at_ms: u64,

    /// Raw message count the rates were computed from.
    pub messages: u64,

    /// Raw payload byte count the rates were computed from.
    pub bytes: u64,
}

impl RateSample {
    /// Compute a sample from raw counts collected over `window`.
    ///
    /// Returns `None` for an empty window, where a rate is undefined.
    pub fn from_window(
        messages: u64,
        bytes: u64,
        window: Duration,
        sampled_at: SystemTime,
    ) -> Option<Self> {
        let secs = window.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }
        Some(Self {
            message_rate: messages as f64 / secs,
            payload_rate_kbs: bytes as f64 / 1024.0 / secs,
            window_secs: secs,
            sampled_at_ms: unix_ms(sampled_at),
            messages,
            bytes,
        })
    }

    /// Time-weighted mean over a run of samples.
    ///
    /// Total messages and bytes are divided by total window time, so a short
    /// window does not count as much as a long one. The result carries the
    /// timestamp of the newest sample. Returns `None` for an empty slice.
    pub fn average<'a, I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a RateSample>,
    {
        let mut messages = 0u64;
        let mut bytes = 0u64;
        let mut secs = 0.0f64;
        let mut newest = None;

        for sample in samples {
            messages = messages.saturating_add(sample.messages);
            bytes = bytes.saturating_add(sample.bytes);
            secs += sample.window_secs;
            newest = Some(newest.map_or(sample.sampled_at_ms, |n: u64| n.max(sample.sampled_at_ms)));
        }

        let sampled_at_ms = newest?;
        if secs <= 0.0 {
            return None;
        }
        Some(Self {
            message_rate: messages as f64 / secs,
            payload_rate_kbs: bytes as f64 / 1024.0 / secs,
            window_secs: secs,
            sampled_at_ms,
            messages,
            bytes,
        })
    }
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch times.
pub fn unix_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rates_from_window() {
        let s = RateSample::from_window(10, 1000, Duration::from_secs(1), SystemTime::now()).unwrap();
        assert!(approx(s.message_rate, 10.0));
        assert!(approx(s.payload_rate_kbs, 1000.0 / 1024.0));
        assert!(approx(s.window_secs, 1.0));
    }

    #[test]
    fn half_second_window_doubles_rate() {
        let s = RateSample::from_window(5, 2048, Duration::from_millis(500), SystemTime::now())
            .unwrap();
        assert!(approx(s.message_rate, 10.0));
        assert!(approx(s.payload_rate_kbs, 4.0));
    }

    #[test]
    fn zero_window_has_no_rate() {
        assert!(RateSample::from_window(3, 3, Duration::ZERO, SystemTime::now()).is_none());
    }

    #[test]
    fn average_is_time_weighted() {
        let now = SystemTime::now();
        let a = RateSample::from_window(10, 0, Duration::from_secs(1), now).unwrap();
        let b = RateSample::from_window(0, 0, Duration::from_secs(3), now).unwrap();
        let avg = RateSample::average([&a, &b]).unwrap();
        assert!(approx(avg.message_rate, 2.5));
        assert!(approx(avg.window_secs, 4.0));
        assert_eq!(avg.messages, 10);
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert!(RateSample::average(Vec::<&RateSample>::new()).is_none());
    }
}
