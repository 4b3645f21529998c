//! Per-alias value cache with rolling history.

use super::history::History;
use crate::types::{HistoryOffset, Value};
use std::collections::HashMap;

type Columns = HashMap<String, History>;

/// Current and historical values per (table, symbol, column).
///
/// Not synchronized on its own; the owning alias lock serializes access.
pub struct DataCache {
    history_length: usize,
    tables: HashMap<String, HashMap<String, Columns>>,
}

impl DataCache {
    /// Create a cache keeping `history_length` values besides the current one.
    pub fn new(history_length: usize) -> Self {
        Self {
            history_length,
            tables: HashMap::new(),
        }
    }

    /// Write the current value, rewinding the previous ones.
    pub fn update(&mut self, table: &str, symbol: &str, column: &str, value: Value) {
        let columns = self
            .tables
            .entry(table.to_string())
            .or_default()
            .entry(symbol.to_string())
            .or_default();

        match columns.get_mut(column) {
            Some(history) => history.record(value, self.history_length),
            None => {
                columns.insert(column.to_string(), History::new(value));
            }
        }
    }

    /// Value at the given depth, if present.
    pub fn get(
        &self,
        table: &str,
        symbol: &str,
        column: &str,
        offset: HistoryOffset,
    ) -> Option<&Value> {
        if offset.depth() > self.history_length {
            return None;
        }
        self.tables
            .get(table)?
            .get(symbol)?
            .get(column)?
            .get(offset.depth())
    }

    /// Current value, if present.
    pub fn current(&self, table: &str, symbol: &str, column: &str) -> Option<&Value> {
        self.get(table, symbol, column, HistoryOffset::CURRENT)
    }

    /// Change how many historical values are kept.
    ///
    /// Shrinking purges every depth beyond the new bound before returning.
    pub fn set_history_length(&mut self, history_length: usize) {
        if history_length < self.history_length {
            for symbols in self.tables.values_mut() {
                for columns in symbols.values_mut() {
                    for history in columns.values_mut() {
                        history.truncate(history_length);
                    }
                }
            }
        }
        self.history_length = history_length;
    }

    pub fn history_length(&self) -> usize {
        self.history_length
    }

    /// Number of cached coordinates.
    pub fn len(&self) -> usize {
        self.tables
            .values()
            .flat_map(|symbols| symbols.values())
            .map(|columns| columns.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new(1)
    }
}
