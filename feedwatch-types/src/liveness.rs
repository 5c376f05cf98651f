//! Tri-state liveness classification derived from data freshness.

use std::fmt;
use std::time::{Duration, SystemTime};

/// Staleness threshold used when nothing else is configured.
pub const DEFAULT_STALENESS_THRESHOLD: Duration = Duration::from_secs(5);

/// Liveness of a feed, derived from when it last produced data.
///
/// `Unknown` means the feed has never produced anything, which keeps
/// "never connected" distinguishable from "was connected, now silent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LivenessState {
    Unknown,
    Connected,
    Disconnected,
}

impl LivenessState {
    /// Classify a feed whose last message arrived at `last`.
    ///
    /// Disconnected only once strictly more than `threshold` has elapsed.
    /// A `last` later than `now` (wall clock stepped backwards) counts as fresh.
    pub fn evaluate(last: Option<SystemTime>, now: SystemTime, threshold: Duration) -> Self {
        let Some(last) = last else {
            return LivenessState::Unknown;
        };
        match now.duration_since(last) {
            Ok(elapsed) if elapsed > threshold => LivenessState::Disconnected,
            _ => LivenessState::Connected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LivenessState::Unknown => "Unknown",
            LivenessState::Connected => "Connected",
            LivenessState::Disconnected => "Disconnected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, LivenessState::Connected)
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = DEFAULT_STALENESS_THRESHOLD;

    #[test]
    fn never_received_is_unknown() {
        assert_eq!(
            LivenessState::evaluate(None, SystemTime::now(), T),
            LivenessState::Unknown
        );
    }

    #[test]
    fn fresh_data_is_connected() {
        let now = SystemTime::now();
        assert_eq!(LivenessState::evaluate(Some(now), now, T), LivenessState::Connected);
        let last = now - Duration::from_millis(4_900);
        assert_eq!(LivenessState::evaluate(Some(last), now, T), LivenessState::Connected);
    }

    #[test]
    fn exactly_at_threshold_is_still_connected() {
        let now = SystemTime::now();
        assert_eq!(
            LivenessState::evaluate(Some(now - T), now, T),
            LivenessState::Connected
        );
    }

    #[test]
    fn stale_data_is_disconnected() {
        let now = SystemTime::now();
        let last = now - Duration::from_millis(5_001);
        assert_eq!(
            LivenessState::evaluate(Some(last), now, T),
            LivenessState::Disconnected
        );
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let now = SystemTime::now();
        let last = now + Duration::from_secs(30);
        assert_eq!(LivenessState::evaluate(Some(last), now, T), LivenessState::Connected);
    }
}
