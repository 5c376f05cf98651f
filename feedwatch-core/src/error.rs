//! Error types for the monitoring core.
//!
//! Only genuinely exceptional conditions are errors here. Duplicate
//! registration, unknown identifiers and feeds without data are normal
//! results (`Identifier`, `None`, `LivenessState::Unknown`), not errors.

use thiserror::Error;

/// Errors raised by a [`Connector`](crate::Connector) or
/// [`FeedTransport`](crate::FeedTransport).
///
/// The feed listener retries all of these with backoff; they never reach
/// callers of the monitor.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish the subscription.
    #[error("Connection to {endpoint} failed: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The connection broke while waiting for a message.
    #[error("Receive failed: {0}")]
    Receive(String),

    /// No message arrived within the idle window.
    #[error("No message received for {0:?}")]
    Idle(std::time::Duration),

    /// The remote side or the in-process sender went away.
    #[error("Transport closed")]
    Closed,

    /// The endpoint cannot be served by this connector.
    #[error("Endpoint not supported: {0}")]
    Unsupported(String),
}

/// Errors from writing or reading recording files.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Underlying file I/O failed.
    #[error("Recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The payload does not fit the 4-byte length prefix.
    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    /// The file ends part-way through a frame.
    #[error("Recording ends with a truncated frame after {complete} complete frames")]
    Truncated { complete: usize },

    /// An earlier write failed part-way and the partial frame is still in
    /// the sink.
    #[error("Recording holds a partial frame past byte {committed}")]
    Torn { committed: u64 },
}

/// Errors from the monitor's lifecycle operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `start()` was called outside a tokio runtime.
    #[error("FeedMonitor::start must be called from within a tokio runtime")]
    NoRuntime,

    /// `start()` was called twice.
    #[error("FeedMonitor is already running")]
    AlreadyStarted,
}
