//! # feedwatch-core
//!
//! Monitoring core for a dynamic set of pub/sub feeds.
//!
//! Each feed is an [`Endpoint`] (address, port, optional topic) with a
//! stable [`Identifier`]. Registered feeds get a background listener that
//! keeps the latest payload, counts messages and bytes, and optionally
//! records every payload to a length-framed file. A periodic aggregator
//! turns the counts into rate samples, and liveness is derived on read from
//! the age of the last message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use feedwatch_core::{DataType, Endpoint, FeedMonitor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let monitor = FeedMonitor::new();
//!     monitor.start().expect("inside a runtime");
//!
//!     let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "sensor1"), DataType::String);
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//!
//!     if let Some(point) = monitor.get_most_recent_data(&id) {
//!         println!("{}: {:?}", id, point.as_str());
//!     }
//!     println!("{:?}", monitor.get_metrics(None).get(&id));
//!     println!("{}", monitor.status(&id));
//!
//!     monitor.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - `zmq` (default): ZeroMQ SUB transport over TCP. Without it, feeds are
//!   fed through a [`ChannelConnector`] or a [`FeedHandle`].

mod aggregator;
mod error;
mod handle;
mod health;
mod listener;
mod monitor;
mod output;
mod recording;
mod registry;
mod state;
mod transport;

pub use aggregator::Aggregator;
pub use error::{MonitorError, RecordingError, TransportError};
pub use handle::FeedHandle;
pub use health::HealthPolicy;
pub use listener::ListenerConfig;
pub use monitor::{FeedMonitor, FeedMonitorBuilder, MonitorConfig};
pub use output::Output;
pub use recording::{
    encode_frame, read_recording, recording_path, Frame, FrameFormat, FrameReader, FrameWriter,
    RecordingConfig, Truncate, RECORDING_EXTENSION,
};
pub use registry::{Registry, Subscription};
pub use state::{DataPoint, FeedState, RawCounters};
pub use transport::{default_connector, ChannelConnector, Connector, FeedMessage, FeedTransport};

#[cfg(feature = "zmq")]
pub use transport::ZmqConnector;

// Re-export types for convenience
pub use feedwatch_types::{
    identify, DataType, Endpoint, FeedSnapshot, FeedStatus, Identifier, LivenessState, RateSample,
};
