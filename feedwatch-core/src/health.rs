//! Health evaluation policy.

use std::time::{Duration, SystemTime};

use feedwatch_types::{LivenessState, DEFAULT_STALENESS_THRESHOLD};

use crate::state::FeedState;

/// How liveness is derived from the time of the last message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// A feed silent for longer than this is `Disconnected`.
    pub staleness_threshold: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
        }
    }
}

impl HealthPolicy {
    pub fn new(staleness_threshold: Duration) -> Self {
        Self {
            staleness_threshold,
        }
    }

    pub fn evaluate(&self, last_received: Option<SystemTime>, now: SystemTime) -> LivenessState {
        LivenessState::evaluate(last_received, now, self.staleness_threshold)
    }

    pub(crate) fn evaluate_feed(&self, feed: &FeedState, now: SystemTime) -> LivenessState {
        self.evaluate(feed.last_received(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_five_seconds() {
        assert_eq!(HealthPolicy::default().staleness_threshold, Duration::from_secs(5));
    }

    #[test]
    fn custom_threshold() {
        let policy = HealthPolicy::new(Duration::from_millis(500));
        let now = SystemTime::now();
        assert_eq!(
            policy.evaluate(Some(now - Duration::from_secs(1)), now),
            LivenessState::Disconnected
        );
        assert_eq!(
            policy.evaluate(Some(now - Duration::from_millis(100)), now),
            LivenessState::Connected
        );
        assert_eq!(policy.evaluate(None, now), LivenessState::Unknown);
    }
}
