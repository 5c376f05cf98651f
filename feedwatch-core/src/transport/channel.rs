//! In-process connector backed by tokio channels.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use feedwatch_types::{Endpoint, Identifier};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Connector, FeedMessage, FeedTransport};
use crate::error::TransportError;

const CHANNEL_CAPACITY: usize = 1024;

struct Slot {
    tx: mpsc::Sender<FeedMessage>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<FeedMessage>>>,
    connects: usize,
}

impl Slot {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            connects: 0,
        }
    }
}

/// Feeds messages to listeners without a network.
///
/// Each endpoint gets one channel. Publishers obtain its sending half with
/// [`sender`](Self::sender); every connect to that endpoint receives from the
/// same queue, so messages sent before a (re)connect are not lost.
///
/// ```rust
/// use feedwatch_core::{ChannelConnector, DataType, Endpoint, FeedMessage, FeedMonitor};
///
/// # tokio_test::block_on(async {
/// let connector = ChannelConnector::new();
/// let endpoint = Endpoint::with_topic("local", 1, "t");
/// let tx = connector.sender(&endpoint);
///
/// let monitor = FeedMonitor::builder().connector(connector).build();
/// monitor.register(endpoint, DataType::String);
/// monitor.start().unwrap();
///
/// tx.send(FeedMessage::single("t hello")).await.unwrap();
/// # monitor.shutdown().await;
/// # });
/// ```
#[derive(Clone, Default)]
pub struct ChannelConnector {
    slots: Arc<Mutex<HashMap<Identifier, Slot>>>,
}

impl ChannelConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sending half for an endpoint's feed.
    pub fn sender(&self, endpoint: &Endpoint) -> mpsc::Sender<FeedMessage> {
        let mut slots = self.slots.lock();
        slots
            .entry(endpoint.identifier())
            .or_insert_with(Slot::new)
            .tx
            .clone()
    }

    /// How many times a listener connected to `endpoint`.
    pub fn connects(&self, endpoint: &Endpoint) -> usize {
        self.slots
            .lock()
            .get(&endpoint.identifier())
            .map(|s| s.connects)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for ChannelConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnector")
            .field("endpoints", &self.slots.lock().len())
            .finish()
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FeedTransport>, TransportError> {
        let rx = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(endpoint.identifier()).or_insert_with(Slot::new);
            slot.connects += 1;
            slot.rx.clone()
        };
        Ok(Box::new(ChannelTransport { rx }))
    }
}

struct ChannelTransport {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<FeedMessage>>>,
}

#[async_trait]
impl FeedTransport for ChannelTransport {
    async fn recv(&mut self) -> Result<FeedMessage, TransportError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(TransportError::Closed)
    }
}
