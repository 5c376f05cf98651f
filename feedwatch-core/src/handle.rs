//! Feed handle for recording received messages.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use feedwatch_types::{Endpoint, Identifier};

use crate::state::FeedState;

/// A handle for pushing messages into one feed's state.
///
/// Feed listeners use this on every receive. It is also the entry point for
/// bridging messages that arrive some other way (a different bus, a replay).
/// Obtain one with [`FeedMonitor::handle`](crate::FeedMonitor::handle).
///
/// # Example
///
/// ```rust
/// use feedwatch_core::{DataType, Endpoint, FeedMonitor};
///
/// let monitor = FeedMonitor::new();
/// let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "sensor1"), DataType::String);
///
/// let handle = monitor.handle(&id).unwrap();
/// handle.record_message("sensor1 21.5C");
///
/// let latest = monitor.get_most_recent_data(&id).unwrap();
/// assert_eq!(latest.as_str(), Some("sensor1 21.5C"));
/// ```
#[derive(Clone)]
pub struct FeedHandle {
    pub(crate) state: Arc<FeedState>,
}

impl FeedHandle {
    pub(crate) fn new(state: Arc<FeedState>) -> Self {
        Self { state }
    }

    /// Record a message received now.
    pub fn record_message(&self, payload: impl Into<Bytes>) {
        self.state.record(payload.into(), SystemTime::now());
    }

    /// Record a message with an explicit receive time.
    pub fn record_message_at(&self, payload: impl Into<Bytes>, received_at: SystemTime) {
        self.state.record(payload.into(), received_at);
    }

    pub fn identifier(&self) -> &Identifier {
        self.state.identifier()
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.state.endpoint()
    }

    /// Whether received payloads should currently be appended to the recording.
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("identifier", self.state.identifier())
            .finish()
    }
}
