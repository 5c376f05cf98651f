//! Feed listener: one background task per subscribed feed.
//!
//! The task connects through the configured [`Connector`], then loops on
//! receive: filter by topic, update the feed's latest value and counters,
//! append to the recording when enabled. Connection failures and idle
//! connections are retried with exponential backoff until the listener is
//! stopped.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::TransportError;
use crate::recording::{FeedRecorder, RecordingConfig};
use crate::state::FeedState;
use crate::transport::{Connector, FeedTransport};

/// Shortest delay between connection attempts, whatever the config says.
const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Reconnect behaviour of feed listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// First delay after a failed connect or a dropped connection.
    pub backoff_initial: Duration,
    /// Upper bound for the doubling delay.
    pub backoff_max: Duration,
    /// Reconnect when nothing has been received for this long.
    pub idle_reconnect: Option<Duration>,
}

impl ListenerConfig {
    /// Backoff bounds as used by the listener: at least [`MIN_BACKOFF`], and
    /// the maximum never below the initial delay.
    fn backoff_bounds(&self) -> (Duration, Duration) {
        let initial = self.backoff_initial.max(MIN_BACKOFF);
        (initial, self.backoff_max.max(initial))
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            backoff_initial: Duration::from_millis(250),
            backoff_max: Duration::from_secs(10),
            idle_reconnect: Some(Duration::from_secs(30)),
        }
    }
}

/// Owner's side of a running listener.
pub(crate) struct ListenerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Ask the listener to stop. It finishes the message in hand first.
    pub(crate) fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Wait for the task to exit.
    pub(crate) async fn join(self) {
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!(error = %e, "Feed listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("stopping", &*self.stop_tx.borrow())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Spawn the listener task for `state` on `runtime`.
pub(crate) fn spawn_listener(
    runtime: &tokio::runtime::Handle,
    state: Arc<FeedState>,
    connector: Arc<dyn Connector>,
    config: ListenerConfig,
    recording: RecordingConfig,
) -> ListenerHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = runtime.spawn(run(state, connector, config, recording, stop_rx));
    ListenerHandle { stop_tx, task }
}

async fn run(
    state: Arc<FeedState>,
    connector: Arc<dyn Connector>,
    config: ListenerConfig,
    recording: RecordingConfig,
    mut stop_rx: watch::Receiver<bool>,
) {
    let id = state.identifier().clone();
    let subscription = state.endpoint().subscription().to_string();
    let mut recorder = FeedRecorder::new(&recording, &id);
    let (backoff_initial, backoff_max) = config.backoff_bounds();
    let mut backoff = backoff_initial;

    info!(feed = %id, url = %state.endpoint().connect_url(), "Feed listener started");

    'connect: loop {
        if *stop_rx.borrow() {
            break;
        }

        let connected = tokio::select! {
            _ = stop_rx.changed() => break 'connect,
            result = connector.connect(state.endpoint()) => result,
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                warn!(feed = %id, error = %e, retry_in = ?backoff, "Connect failed");
                if wait_or_stop(backoff, &mut stop_rx).await {
                    break;
                }
                backoff = (backoff * 2).min(backoff_max);
                continue;
            }
        };

        info!(feed = %id, "Subscribed");
        backoff = backoff_initial;

        loop {
            let next = tokio::select! {
                _ = stop_rx.changed() => break 'connect,
                result = recv_with_idle(transport.as_mut(), config.idle_reconnect) => result,
            };

            match next {
                Ok(message) => {
                    if !message.matches(&subscription) {
                        trace!(feed = %id, "Message outside topic ignored");
                        continue;
                    }
                    let payload = message.payload();
                    let received_at = SystemTime::now();
                    state.record(payload.clone(), received_at);
                    recorder.on_message(&state, &payload, received_at).await;
                    trace!(feed = %id, bytes = payload.len(), "Message received");
                }
                Err(e) => {
                    warn!(feed = %id, error = %e, retry_in = ?backoff, "Connection lost, reconnecting");
                    break;
                }
            }
        }

        drop(transport);
        if wait_or_stop(backoff, &mut stop_rx).await {
            break;
        }
        backoff = (backoff * 2).min(backoff_max);
    }

    recorder.close().await;
    debug!(feed = %id, "Feed listener stopped");
}

async fn recv_with_idle(
    transport: &mut dyn FeedTransport,
    idle: Option<Duration>,
) -> Result<crate::transport::FeedMessage, TransportError> {
    match idle {
        Some(idle) => match tokio::time::timeout(idle, transport.recv()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Idle(idle)),
        },
        None => transport.recv().await,
    }
}

/// Sleep for `delay`; returns true if a stop was requested meanwhile.
async fn wait_or_stop(delay: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *stop_rx.borrow(),
        _ = stop_rx.changed() => true,
    }
}
