//! Rolling history for a single coordinate.

use crate::types::Value;
use std::collections::VecDeque;

/// Most recent value first; holds at most `history_length + 1` values.
#[derive(Clone, Debug, Default)]
pub struct History {
    values: VecDeque<Value>,
}

impl History {
    pub fn new(value: Value) -> Self {
        let mut values = VecDeque::with_capacity(2);
        values.push_front(value);
        Self { values }
    }

    /// Shift every depth back by one and write `value` at depth 0.
    pub fn record(&mut self, value: Value, history_length: usize) {
        if history_length == 0 {
            self.values.truncate(1);
            match self.values.front_mut() {
                Some(current) => *current = value,
                None => self.values.push_front(value),
            }
            return;
        }

        self.values.push_front(value);
        self.values.truncate(history_length + 1);
    }

    pub fn get(&self, depth: usize) -> Option<&Value> {
        self.values.get(depth)
    }

    pub fn current(&self) -> Option<&Value> {
        self.values.front()
    }

    /// Drop everything deeper than `history_length`.
    pub fn truncate(&mut self, history_length: usize) {
        self.values.truncate(history_length + 1);
    }

    /// Number of retained depths, including the current value.
    pub fn depth(&self) -> usize {
        self.values.len()
    }
}
