//! Per-feed shared state: latest-value slot, raw counters and rate history.
//!
//! Every registered feed owns one [`FeedState`]. Its listener is the only
//! writer of the latest value and the counters; the aggregator is the only
//! writer of the history. Each piece sits behind its own small lock, so
//! unrelated feeds never contend and readers never see a half-written value.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use feedwatch_types::{unix_ms, DataType, Endpoint, Identifier, RateSample};
use parking_lot::{Mutex, RwLock};

use crate::listener::ListenerHandle;

/// The most recent payload received on a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    pub payload: Bytes,
    pub received_at: SystemTime,
}

impl DataPoint {
    pub fn new(payload: impl Into<Bytes>, received_at: SystemTime) -> Self {
        Self {
            payload: payload.into(),
            received_at,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    pub fn received_at_ms(&self) -> u64 {
        unix_ms(self.received_at)
    }
}

/// Message and byte counts accumulated since the last aggregation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCounters {
    pub message_count: u64,
    pub payload_bytes: u64,
    pub window_start: Instant,
}

impl RawCounters {
    fn starting_at(window_start: Instant) -> Self {
        Self {
            message_count: 0,
            payload_bytes: 0,
            window_start,
        }
    }
}

/// A feed's listener task, if one runs.
///
/// Retired when the feed is unregistered. A retired slot never takes a new
/// listener, so a registration racing with removal cannot leave a task
/// behind that shutdown no longer sees.
#[derive(Debug, Default)]
pub(crate) struct ListenerSlot {
    handle: Option<ListenerHandle>,
    retired: bool,
}

impl ListenerSlot {
    pub(crate) fn is_vacant(&self) -> bool {
        self.handle.is_none() && !self.retired
    }

    pub(crate) fn is_occupied(&self) -> bool {
        self.handle.is_some()
    }

    pub(crate) fn fill(&mut self, handle: ListenerHandle) {
        debug_assert!(self.is_vacant());
        self.handle = Some(handle);
    }

    pub(crate) fn take(&mut self) -> Option<ListenerHandle> {
        self.handle.take()
    }

    pub(crate) fn retire(&mut self) -> Option<ListenerHandle> {
        self.retired = true;
        self.handle.take()
    }
}

/// Thread-safe state for a single feed.
#[derive(Debug)]
pub struct FeedState {
    pub(crate) identifier: Identifier,
    pub(crate) endpoint: Endpoint,
    pub(crate) data_type: DataType,
    latest: RwLock<Option<DataPoint>>,
    counters: Mutex<RawCounters>,
    history: Mutex<VecDeque<RateSample>>,
    history_capacity: usize,
    pub(crate) recording: AtomicBool,
    pub(crate) dropped_frames: AtomicU64,
    pub(crate) listener: Mutex<ListenerSlot>,
}

impl FeedState {
    pub fn new(endpoint: Endpoint, data_type: DataType, history_capacity: usize) -> Self {
        Self {
            identifier: endpoint.identifier(),
            endpoint,
            data_type,
            latest: RwLock::new(None),
            counters: Mutex::new(RawCounters::starting_at(Instant::now())),
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity: history_capacity.max(1),
            recording: AtomicBool::new(false),
            dropped_frames: AtomicU64::new(0),
            listener: Mutex::new(ListenerSlot::default()),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Hot path: overwrite the latest value and bump the counters.
    pub fn record(&self, payload: Bytes, received_at: SystemTime) {
        let len = payload.len() as u64;
        *self.latest.write() = Some(DataPoint {
            payload,
            received_at,
        });

        let mut counters = self.counters.lock();
        counters.message_count += 1;
        counters.payload_bytes += len;
    }

    pub fn latest(&self) -> Option<DataPoint> {
        self.latest.read().clone()
    }

    pub fn last_received(&self) -> Option<SystemTime> {
        self.latest.read().as_ref().map(|p| p.received_at)
    }

    /// Take the counters accumulated so far and start a new window at `now`.
    pub fn drain(&self, now: Instant) -> RawCounters {
        std::mem::replace(&mut *self.counters.lock(), RawCounters::starting_at(now))
    }

    /// Current counters without resetting them.
    pub fn peek_counters(&self) -> RawCounters {
        *self.counters.lock()
    }

    /// Append a sample, evicting the oldest once the history is full.
    pub fn push_sample(&self, sample: RateSample) {
        let mut history = self.history.lock();
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(sample);
    }

    pub fn latest_sample(&self) -> Option<RateSample> {
        self.history.lock().back().cloned()
    }

    pub fn history(&self) -> Vec<RateSample> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn average_sample(&self) -> Option<RateSample> {
        RateSample::average(self.history.lock().iter())
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    pub fn set_recording(&self, on: bool) {
        self.recording.store(on, Ordering::Relaxed);
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}
