//! Bidirectional index between topics and coordinates.

use super::types::Subscription;
use crate::types::{SlotId, TopicId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Key used in the symbol position of a topic map.
///
/// Direct maps are keyed by symbol name, wildcard maps by slot id.
pub trait SymbolKey: Clone + Eq + Hash + Debug {
    /// Blank keys are never indexed.
    fn is_blank(&self) -> bool;
}

impl SymbolKey for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl SymbolKey for SlotId {
    fn is_blank(&self) -> bool {
        false
    }
}

/// Where a topic is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapKey<K> {
    pub table: String,
    pub key: K,
    pub column: String,
}

type Columns = HashMap<String, Vec<Subscription>>;

/// Per-alias index of subscriptions.
///
/// The forward view (table → key → column → subscriptions) and the reverse
/// view (topic → coordinate) are always updated together.
pub struct TopicMap<K: SymbolKey> {
    forward: HashMap<String, HashMap<K, Columns>>,
    reverse: HashMap<TopicId, MapKey<K>>,
}

impl<K: SymbolKey> TopicMap<K> {
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    /// Register a subscription. Returns false if any coordinate part is blank.
    ///
    /// A topic that is already registered is moved: its previous mapping is
    /// removed first so it never appears under two coordinates.
    pub fn add_topic(&mut self, table: &str, key: K, column: &str, sub: Subscription) -> bool {
        if table.is_empty() || key.is_blank() || column.is_empty() {
            return false;
        }

        if self.reverse.contains_key(&sub.topic) {
            self.remove_topic(sub.topic);
        }

        self.reverse.insert(
            sub.topic,
            MapKey {
                table: table.to_string(),
                key: key.clone(),
                column: column.to_string(),
            },
        );

        self.forward
            .entry(table.to_string())
            .or_default()
            .entry(key)
            .or_default()
            .entry(column.to_string())
            .or_default()
            .push(sub);

        true
    }

    /// Subscriptions for a coordinate.
    ///
    /// `None` means the table or key is unknown; `Some(&[])` means the key is
    /// known but nothing watches this column.
    pub fn get_topics(&self, table: &str, key: &K, column: &str) -> Option<&[Subscription]> {
        let columns = self.forward.get(table)?.get(key)?;
        Some(columns.get(column).map(Vec::as_slice).unwrap_or(&[]))
    }

    /// Remove a topic, returning where it was registered.
    pub fn remove_topic(&mut self, topic: TopicId) -> Option<MapKey<K>> {
        let map_key = self.reverse.remove(&topic)?;

        if let Some(keys) = self.forward.get_mut(&map_key.table) {
            if let Some(columns) = keys.get_mut(&map_key.key) {
                if let Some(subs) = columns.get_mut(&map_key.column) {
                    if let Some(pos) = subs.iter().position(|s| s.topic == topic) {
                        subs.remove(pos);
                    }
                    if subs.is_empty() {
                        columns.remove(&map_key.column);
                    }
                }
                if columns.is_empty() {
                    keys.remove(&map_key.key);
                }
            }
            if keys.is_empty() {
                self.forward.remove(&map_key.table);
            }
        }

        Some(map_key)
    }

    pub fn contains_topic(&self, topic: TopicId) -> bool {
        self.reverse.contains_key(&topic)
    }

    /// True if any column under the key has at least one subscription.
    pub fn contains_symbol(&self, table: &str, key: &K) -> bool {
        self.forward
            .get(table)
            .and_then(|keys| keys.get(key))
            .map(|columns| columns.values().any(|subs| !subs.is_empty()))
            .unwrap_or(false)
    }

    pub fn contains_column(&self, table: &str, key: &K, column: &str) -> bool {
        self.get_topics(table, key, column)
            .map(|subs| !subs.is_empty())
            .unwrap_or(false)
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.forward.contains_key(table)
    }

    /// Keys with live subscriptions for a table.
    pub fn symbols(&self, table: &str) -> Vec<K> {
        self.forward
            .get(table)
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn tables(&self) -> Vec<String> {
        self.forward.keys().cloned().collect()
    }

    /// Subscriptions across all columns of a key.
    pub fn topic_count(&self, table: &str, key: &K) -> usize {
        self.forward
            .get(table)
            .and_then(|keys| keys.get(key))
            .map(|columns| columns.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Where a topic is registered.
    pub fn key_of(&self, topic: TopicId) -> Option<&MapKey<K>> {
        self.reverse.get(&topic)
    }

    /// All registered topics.
    pub fn topics(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.reverse.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }
}

impl<K: SymbolKey> Default for TopicMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
