//! Subscription registry: the identifier -> feed state map.

use std::collections::BTreeMap;
use std::sync::Arc;

use feedwatch_types::{DataType, Endpoint, Identifier};
use parking_lot::RwLock;

use crate::state::FeedState;

/// A registered feed as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub identifier: Identifier,
    pub endpoint: Endpoint,
    pub data_type: DataType,
    pub recording: bool,
}

impl Subscription {
    fn of(state: &FeedState) -> Self {
        Self {
            identifier: state.identifier.clone(),
            endpoint: state.endpoint.clone(),
            data_type: state.data_type,
            recording: state.is_recording(),
        }
    }
}

/// All registered feeds.
///
/// The map lock is only held to find, insert or remove entries; per-feed
/// reads and writes go through the [`FeedState`] handed out.
#[derive(Debug, Default)]
pub struct Registry {
    feeds: RwLock<BTreeMap<Identifier, Arc<FeedState>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feed unless one with the same identifier exists.
    ///
    /// Returns the feed's state and whether it was newly created. An existing
    /// feed keeps the data type it was first registered with.
    pub fn get_or_insert(
        &self,
        endpoint: Endpoint,
        data_type: DataType,
        history_capacity: usize,
    ) -> (Arc<FeedState>, bool) {
        let id = endpoint.identifier();

        // Fast path: already registered
        {
            let feeds = self.feeds.read();
            if let Some(state) = feeds.get(&id) {
                return (state.clone(), false);
            }
        }

        // Slow path: check again under the write lock
        let mut feeds = self.feeds.write();
        if let Some(state) = feeds.get(&id) {
            return (state.clone(), false);
        }
        let state = Arc::new(FeedState::new(endpoint, data_type, history_capacity));
        feeds.insert(id, state.clone());
        (state, true)
    }

    pub fn get(&self, id: &Identifier) -> Option<Arc<FeedState>> {
        self.feeds.read().get(id).cloned()
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.feeds.read().contains_key(id)
    }

    pub fn remove(&self, id: &Identifier) -> Option<Arc<FeedState>> {
        self.feeds.write().remove(id)
    }

    /// All identifiers, taken under a single read of the map.
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.feeds.read().keys().cloned().collect()
    }

    /// All feed states, taken under a single read of the map.
    pub fn feeds(&self) -> Vec<Arc<FeedState>> {
        self.feeds.read().values().cloned().collect()
    }

    pub fn subscription(&self, id: &Identifier) -> Option<Subscription> {
        self.feeds.read().get(id).map(|s| Subscription::of(s))
    }

    pub fn data_type(&self, id: &Identifier) -> DataType {
        self.feeds
            .read()
            .get(id)
            .map(|s| s.data_type)
            .unwrap_or(DataType::Unknown)
    }

    pub fn len(&self) -> usize {
        self.feeds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.read().is_empty()
    }
}
