//! The feed monitor service.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant, SystemTime};

use feedwatch_types::{
    unix_ms, DataType, Endpoint, FeedSnapshot, FeedStatus, Identifier, LivenessState, RateSample,
    DEFAULT_HISTORY_CAPACITY,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::error::MonitorError;
use crate::handle::FeedHandle;
use crate::health::HealthPolicy;
use crate::listener::{spawn_listener, ListenerConfig, ListenerHandle};
use crate::output::Output;
use crate::recording::{FrameFormat, RecordingConfig};
use crate::registry::{Registry, Subscription};
use crate::state::{DataPoint, FeedState};
use crate::transport::{default_connector, Connector};

/// Tunables of a [`FeedMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Period of the metrics aggregator.
    pub aggregation_interval: Duration,
    /// Rate samples kept per feed.
    pub history_capacity: usize,
    pub health: HealthPolicy,
    pub listener: ListenerConfig,
    pub recording: RecordingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            aggregation_interval: Duration::from_secs(1),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            health: HealthPolicy::default(),
            listener: ListenerConfig::default(),
            recording: RecordingConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn with_aggregation_interval(mut self, interval: Duration) -> Self {
        self.aggregation_interval = interval;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.health = HealthPolicy::new(threshold);
        self
    }

    pub fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_recording_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.recording.directory = directory.into();
        self
    }

    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.recording.format = format;
        self
    }
}

struct Running {
    runtime: tokio::runtime::Handle,
    stop_tx: watch::Sender<bool>,
    aggregator_task: JoinHandle<()>,
}

struct Inner {
    registry: Registry,
    aggregator: Aggregator,
    config: MonitorConfig,
    connector: Arc<dyn Connector>,
    outputs: Vec<Output>,
    running: Mutex<Option<Running>>,
}

/// Watches a dynamic set of pub/sub feeds.
///
/// Register endpoints, then read the latest payload, throughput and liveness
/// of each feed by identifier. Cloning is cheap and every clone drives the
/// same feeds.
///
/// Registration works before and after [`start`](Self::start). Feeds
/// registered before `start` begin listening when it is called; feeds
/// registered afterwards begin immediately, even when `register` is called
/// from a thread outside the runtime.
///
/// # Example
///
/// ```rust,no_run
/// use feedwatch_core::{DataType, Endpoint, FeedMonitor, Output};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let monitor = FeedMonitor::builder()
///         .output(Output::file("feeds.json"))
///         .build();
///
///     let id = monitor.register(Endpoint::with_topic("127.0.0.1", 5555, "sensor1"), DataType::String);
///     monitor.start().expect("inside a runtime");
///
///     tokio::time::sleep(Duration::from_secs(3)).await;
///     println!("{} is {}", id, monitor.status(&id));
///
///     monitor.shutdown().await;
/// }
/// ```
#[derive(Clone)]
pub struct FeedMonitor {
    inner: Arc<Inner>,
}

impl FeedMonitor {
    /// A monitor with default settings, the default connector and no outputs.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> FeedMonitorBuilder {
        FeedMonitorBuilder::new()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Register a feed and return its identifier.
    ///
    /// Registering an endpoint that is already registered returns the same
    /// identifier and starts nothing new. The data type given first is kept.
    pub fn register(&self, endpoint: Endpoint, data_type: DataType) -> Identifier {
        let (state, created) =
            self.inner
                .registry
                .get_or_insert(endpoint, data_type, self.inner.config.history_capacity);
        let id = state.identifier().clone();

        if !created {
            debug!(feed = %id, "Feed already registered");
            return id;
        }
        info!(feed = %id, data_type = %data_type, "Feed registered");

        let running = self.inner.running.lock();
        if let Some(running) = running.as_ref() {
            self.ensure_listener(&running.runtime, &state);
        }
        id
    }

    /// Stop a feed's listener and forget the feed.
    ///
    /// Returns false if the identifier was not registered.
    pub fn unregister(&self, id: &Identifier) -> bool {
        let Some(state) = self.inner.registry.remove(id) else {
            return false;
        };
        if let Some(listener) = state.listener.lock().retire() {
            listener.stop();
        }
        info!(feed = %id, "Feed unregistered");
        true
    }

    /// The identifier an endpoint has or would have. Does not register.
    pub fn lookup(&self, endpoint: &Endpoint) -> Identifier {
        endpoint.identifier()
    }

    pub fn is_registered(&self, endpoint: &Endpoint) -> bool {
        self.inner.registry.contains(&endpoint.identifier())
    }

    /// All registered identifiers, in sorted order.
    pub fn list(&self) -> Vec<Identifier> {
        self.inner.registry.identifiers()
    }

    /// Declared data type, or `Unknown` for unregistered identifiers.
    pub fn data_type(&self, id: &Identifier) -> DataType {
        self.inner.registry.data_type(id)
    }

    pub fn subscription(&self, id: &Identifier) -> Option<Subscription> {
        self.inner.registry.subscription(id)
    }

    /// A handle for feeding messages to a registered feed directly.
    pub fn handle(&self, id: &Identifier) -> Option<FeedHandle> {
        self.inner.registry.get(id).map(FeedHandle::new)
    }

    /// The latest payload of a feed, if it has received anything.
    pub fn get_most_recent_data(&self, id: &Identifier) -> Option<DataPoint> {
        self.inner.registry.get(id).and_then(|feed| feed.latest())
    }

    /// The latest payload of every feed that has received anything.
    pub fn get_most_recent_data_all(&self) -> BTreeMap<Identifier, DataPoint> {
        self.inner
            .registry
            .feeds()
            .into_iter()
            .filter_map(|feed| feed.latest().map(|p| (feed.identifier().clone(), p)))
            .collect()
    }

    /// Liveness of a feed right now.
    pub fn status(&self, id: &Identifier) -> LivenessState {
        self.status_at(id, SystemTime::now())
    }

    /// Liveness of a feed as of `now`.
    pub fn status_at(&self, id: &Identifier, now: SystemTime) -> LivenessState {
        match self.inner.registry.get(id) {
            Some(feed) => self.inner.config.health.evaluate_feed(&feed, now),
            None => LivenessState::Unknown,
        }
    }

    pub fn statuses(&self) -> BTreeMap<Identifier, LivenessState> {
        let now = SystemTime::now();
        self.inner
            .registry
            .feeds()
            .into_iter()
            .map(|feed| {
                let state = self.inner.config.health.evaluate_feed(&feed, now);
                (feed.identifier().clone(), state)
            })
            .collect()
    }

    /// Latest rate sample per feed.
    ///
    /// With a filter, only the listed identifiers are considered. Feeds that
    /// are unknown or have no sample yet are left out.
    pub fn get_metrics(&self, filter: Option<&[Identifier]>) -> BTreeMap<Identifier, RateSample> {
        let feeds: Vec<Arc<FeedState>> = match filter {
            Some(ids) => ids.iter().filter_map(|id| self.inner.registry.get(id)).collect(),
            None => self.inner.registry.feeds(),
        };
        feeds
            .into_iter()
            .filter_map(|feed| feed.latest_sample().map(|s| (feed.identifier().clone(), s)))
            .collect()
    }

    /// Time-weighted average over a feed's rate history.
    pub fn get_average_metrics(&self, id: &Identifier) -> Option<RateSample> {
        self.inner.registry.get(id).and_then(|feed| feed.average_sample())
    }

    /// A feed's rate history, oldest first.
    pub fn metrics_history(&self, id: &Identifier) -> Vec<RateSample> {
        self.inner
            .registry
            .get(id)
            .map(|feed| feed.history())
            .unwrap_or_default()
    }

    /// Start appending a feed's payloads to its recording file.
    ///
    /// Returns false if the identifier is not registered.
    pub fn start_recording(&self, id: &Identifier) -> bool {
        self.set_recording(id, true)
    }

    /// Stop recording a feed. Returns false if the identifier is not registered.
    pub fn stop_recording(&self, id: &Identifier) -> bool {
        self.set_recording(id, false)
    }

    pub fn is_recording(&self, id: &Identifier) -> bool {
        self.inner
            .registry
            .get(id)
            .map(|feed| feed.is_recording())
            .unwrap_or(false)
    }

    fn set_recording(&self, id: &Identifier, on: bool) -> bool {
        match self.inner.registry.get(id) {
            Some(feed) => {
                if feed.is_recording() != on {
                    feed.set_recording(on);
                    info!(feed = %id, recording = on, "Recording toggled");
                }
                true
            }
            None => false,
        }
    }

    /// Run one aggregation cycle ending at `now`.
    ///
    /// The background task calls this once per interval; it is public for
    /// callers that drive aggregation themselves.
    pub fn aggregate_at(&self, now: Instant) -> usize {
        self.inner.aggregator.run_cycle(&self.inner.registry, now)
    }

    /// The state of every feed right now.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot_at(SystemTime::now())
    }

    pub fn snapshot_at(&self, now: SystemTime) -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::with_timestamp(unix_ms(now));
        for feed in self.inner.registry.feeds() {
            let latest = feed.latest();
            let mut status = FeedStatus::new(feed.endpoint().clone(), feed.data_type());
            status.liveness = self
                .inner
                .config
                .health
                .evaluate(latest.as_ref().map(|p| p.received_at), now);
            status.last_received_ms = latest.as_ref().map(DataPoint::received_at_ms);
            status.last_payload_len = latest.as_ref().map(DataPoint::len);
            status.latest = feed.latest_sample();
            status.recording = feed.is_recording();
            status.dropped_frames = feed.dropped_frames();
            snapshot.insert(status);
        }
        snapshot
    }

    /// Start listening on every registered feed and start the aggregator.
    ///
    /// Must be called from within a tokio runtime; later registrations spawn
    /// their listeners on that same runtime.
    pub fn start(&self) -> Result<(), MonitorError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let mut running = self.inner.running.lock();
        if running.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }

        let feeds = self.inner.registry.feeds();
        for feed in &feeds {
            self.ensure_listener(&runtime, feed);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.inner
            .aggregator
            .reset(tokio::time::Instant::now().into_std());
        let aggregator_task = runtime.spawn(run_aggregation(
            Arc::downgrade(&self.inner),
            self.inner.config.aggregation_interval,
            stop_rx,
        ));

        *running = Some(Running {
            runtime,
            stop_tx,
            aggregator_task,
        });
        info!(
            feeds = feeds.len(),
            interval = ?self.inner.config.aggregation_interval,
            "Feed monitor started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.lock().is_some()
    }

    /// Stop the aggregator and every listener and wait for them to exit.
    ///
    /// Open recordings are flushed and closed. Does nothing if the monitor
    /// is not running. The monitor can be started again afterwards.
    pub async fn shutdown(&self) {
        let running = self.inner.running.lock().take();
        let Some(running) = running else {
            return;
        };

        let _ = running.stop_tx.send(true);
        let listeners: Vec<ListenerHandle> = self
            .inner
            .registry
            .feeds()
            .iter()
            .filter_map(|feed| feed.listener.lock().take())
            .collect();
        for listener in &listeners {
            listener.stop();
        }
        let count = listeners.len();
        for listener in listeners {
            listener.join().await;
        }
        if let Err(e) = running.aggregator_task.await {
            warn!(error = %e, "Aggregator task failed");
        }
        info!(listeners = count, "Feed monitor stopped");
    }

    fn ensure_listener(&self, runtime: &tokio::runtime::Handle, state: &Arc<FeedState>) {
        let mut slot = state.listener.lock();
        if slot.is_vacant() {
            slot.fill(spawn_listener(
                runtime,
                state.clone(),
                self.inner.connector.clone(),
                self.inner.config.listener.clone(),
                self.inner.config.recording.clone(),
            ));
        }
    }
}

impl Default for FeedMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeedMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedMonitor")
            .field("feeds", &self.inner.registry.len())
            .field("outputs", &self.inner.outputs)
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_aggregation(inner: Weak<Inner>, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let monitor = FeedMonitor { inner };
                monitor.aggregate_at(tokio::time::Instant::now().into_std());

                if !monitor.inner.outputs.is_empty() {
                    let snapshot = monitor.snapshot();
                    for output in monitor.inner.outputs.iter() {
                        if let Err(e) = output.emit(&snapshot).await {
                            warn!(error = %e, "Failed to emit snapshot");
                        }
                    }
                }
            }
            _ = stop_rx.changed() => break,
        }
    }
    debug!("Aggregator stopped");
}

/// Builder for [`FeedMonitor`].
#[derive(Default)]
pub struct FeedMonitorBuilder {
    config: MonitorConfig,
    connector: Option<Arc<dyn Connector>>,
    outputs: Vec<Output>,
}

impl FeedMonitorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport used to subscribe to feeds. Defaults to ZeroMQ.
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Add a snapshot destination. Can be called multiple times.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn aggregation_interval(mut self, interval: Duration) -> Self {
        self.config.aggregation_interval = interval;
        self
    }

    pub fn staleness_threshold(mut self, threshold: Duration) -> Self {
        self.config.health = HealthPolicy::new(threshold);
        self
    }

    pub fn recording_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.recording.directory = directory.into();
        self
    }

    pub fn build(self) -> FeedMonitor {
        FeedMonitor {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                aggregator: Aggregator::default(),
                config: self.config,
                connector: self.connector.unwrap_or_else(default_connector),
                outputs: self.outputs,
                running: Mutex::new(None),
            }),
        }
    }
}
