//! FeedSnapshot - a point-in-time view of every monitored feed.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::{unix_ms, DataType, Endpoint, Identifier, LivenessState, RateSample, SchemaVersion};

/// A point-in-time snapshot of all registered feeds.
///
/// Snapshots are emitted after every aggregation cycle and are what
/// dashboards, exporters and tests consume.
///
/// # Example
///
/// ```rust
/// use feedwatch_types::{DataType, Endpoint, FeedSnapshot, FeedStatus, LivenessState};
///
/// let endpoint = Endpoint::with_topic("127.0.0.1", 5555, "topic0");
/// let mut snapshot = FeedSnapshot::new();
/// snapshot.insert(FeedStatus::new(endpoint, DataType::String));
///
/// assert_eq!(snapshot.len(), 1);
/// assert_eq!(snapshot.count(LivenessState::Unknown), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedSnapshot {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Status of each feed, keyed by identifier.
    pub feeds: BTreeMap<Identifier, FeedStatus>,
}

impl FeedSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self::with_timestamp(unix_ms(SystemTime::now()))
    }

    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            version: SchemaVersion::current(),
            timestamp_ms,
            feeds: BTreeMap::new(),
        }
    }

    /// Add a feed, keyed by its endpoint's identifier.
    pub fn insert(&mut self, status: FeedStatus) {
        self.feeds.insert(status.identifier.clone(), status);
    }

    pub fn get(&self, id: &Identifier) -> Option<&FeedStatus> {
        self.feeds.get(id)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Number of feeds currently in `state`.
    pub fn count(&self, state: LivenessState) -> usize {
        self.feeds.values().filter(|f| f.liveness == state).count()
    }

    /// Sum of the latest message rates across all feeds.
    pub fn total_message_rate(&self) -> f64 {
        self.feeds
            .values()
            .filter_map(|f| f.latest.as_ref())
            .map(|s| s.message_rate)
            .sum()
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything known about one feed at snapshot time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedStatus {
    pub identifier: Identifier,
    pub endpoint: Endpoint,
    pub data_type: DataType,
    pub liveness: LivenessState,

    /// Unix milliseconds of the most recent message.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_received_ms: Option<u64>,

    /// Byte length of the most recent payload.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_payload_len: Option<usize>,

    /// Most recent rate sample.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub latest: Option<RateSample>,

    /// Whether payloads are currently being recorded.
    pub recording: bool,

    /// Frames lost to recording write failures.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dropped_frames: u64,
}

impl FeedStatus {
    /// A status for a feed that has produced nothing yet.
    pub fn new(endpoint: Endpoint, data_type: DataType) -> Self {
        Self {
            identifier: endpoint.identifier(),
            endpoint,
            data_type,
            liveness: LivenessState::Unknown,
            last_received_ms: None,
            last_payload_len: None,
            latest: None,
            recording: false,
            dropped_frames: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_by_state() {
        let mut snapshot = FeedSnapshot::with_timestamp(42);
        let mut a = FeedStatus::new(Endpoint::with_topic("h", 1, "a"), DataType::String);
        a.liveness = LivenessState::Connected;
        let b = FeedStatus::new(Endpoint::with_topic("h", 1, "b"), DataType::Image);
        snapshot.insert(a);
        snapshot.insert(b);

        assert_eq!(snapshot.timestamp_ms, 42);
        assert_eq!(snapshot.count(LivenessState::Connected), 1);
        assert_eq!(snapshot.count(LivenessState::Unknown), 1);
        assert_eq!(snapshot.count(LivenessState::Disconnected), 0);
    }

    #[test]
    fn total_rate_ignores_feeds_without_samples() {
        let mut snapshot = FeedSnapshot::new();
        let mut a = FeedStatus::new(Endpoint::new("h", 1), DataType::String);
        a.latest = RateSample::from_window(
            4,
            0,
            std::time::Duration::from_secs(2),
            SystemTime::now(),
        );
        snapshot.insert(a);
        snapshot.insert(FeedStatus::new(Endpoint::new("h", 2), DataType::String));
        assert!((snapshot.total_message_rate() - 2.0).abs() < 1e-9);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_json_is_keyed_by_identifier() {
        let mut snapshot = FeedSnapshot::with_timestamp(1);
        snapshot.insert(FeedStatus::new(
            Endpoint::with_topic("127.0.0.1", 5555, "sensor1"),
            DataType::String,
        ));
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json["feeds"]["127.0.0.1-5555-sensor1"]["liveness"],
            serde_json::json!("Unknown")
        );
        let back: FeedSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
