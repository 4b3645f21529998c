//! State owned by one data-source connection.

use crate::cache::DataCache;
use crate::slots::SlotRegistry;
use crate::topics::TopicMap;
use crate::types::{SlotId, TopicId};
use serde::Serialize;

/// Everything the hub tracks for one alias.
///
/// Always accessed under the alias mutex; the whole batch dispatch runs
/// under that same lock.
pub struct AliasState {
    pub(crate) name: String,
    /// Subscriptions naming a literal symbol.
    pub(crate) direct: TopicMap<String>,
    /// Subscriptions naming a wildcard slot.
    pub(crate) wildcard: TopicMap<SlotId>,
    pub(crate) cache: DataCache,
    pub(crate) slots: SlotRegistry,
    /// Whether the data source is currently attached.
    pub(crate) connected: bool,
    /// Set once the alias has been torn down; late batches are abandoned.
    pub(crate) closed: bool,
    pub(crate) batches: u64,
    pub(crate) rows: u64,
    pub(crate) failed_pushes: u64,
}

impl AliasState {
    pub(crate) fn new(name: impl Into<String>, history_length: usize) -> Self {
        Self {
            name: name.into(),
            direct: TopicMap::new(),
            wildcard: TopicMap::new(),
            cache: DataCache::new(history_length),
            slots: SlotRegistry::new(),
            connected: false,
            closed: false,
            batches: 0,
            rows: 0,
            failed_pushes: 0,
        }
    }

    /// Drop all topics, cached values and slots, returning the removed topics.
    pub(crate) fn clear(&mut self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = self.direct.topics().collect();
        topics.extend(self.wildcard.topics());

        self.direct.clear();
        self.wildcard.clear();
        self.cache.clear();
        self.slots.clear();
        self.connected = false;
        topics
    }

    pub(crate) fn stats(&self) -> AliasStats {
        AliasStats {
            alias: self.name.clone(),
            connected: self.connected,
            direct_topics: self.direct.len(),
            wildcard_topics: self.wildcard.len(),
            cached_coordinates: self.cache.len(),
            history_length: self.cache.history_length(),
            allocated_slots: self.slots.slot_count(),
            bound_slots: self.slots.bound_count(),
            batches: self.batches,
            rows: self.rows,
            failed_pushes: self.failed_pushes,
        }
    }
}

/// Point-in-time statistics for an alias.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AliasStats {
    pub alias: String,
    pub connected: bool,
    pub direct_topics: usize,
    pub wildcard_topics: usize,
    pub cached_coordinates: usize,
    pub history_length: usize,
    pub allocated_slots: usize,
    pub bound_slots: usize,
    pub batches: u64,
    pub rows: u64,
    pub failed_pushes: u64,
}
