//! Wildcard slot allocation.

use crate::cache::DataCache;
use crate::types::{HistoryOffset, SlotId, Value};
use std::collections::{HashMap, HashSet};

/// Slot state for one table.
#[derive(Debug, Default)]
struct TableSlots {
    /// Known slots in allocation order, with their bound symbol.
    slots: Vec<(SlotId, Option<String>)>,
    /// Inverse of `slots` for bound entries.
    by_symbol: HashMap<String, SlotId>,
    /// Every symbol seen on the wire, in first-seen order.
    seen: Vec<String>,
    seen_set: HashSet<String>,
}

impl TableSlots {
    fn position(&self, slot: SlotId) -> Option<usize> {
        self.slots.iter().position(|(id, _)| *id == slot)
    }

    fn bind_at(&mut self, index: usize, symbol: &str) -> SlotId {
        let (id, bound) = &mut self.slots[index];
        *bound = Some(symbol.to_string());
        self.by_symbol.insert(symbol.to_string(), *id);
        *id
    }

    fn unbind_at(&mut self, index: usize) -> Option<String> {
        let symbol = self.slots[index].1.take()?;
        self.by_symbol.remove(&symbol);
        Some(symbol)
    }
}

/// Per-alias registry binding wildcard slots to symbols.
///
/// A symbol is bound to at most one slot and a slot to at most one symbol.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    tables: HashMap<String, TableSlots>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unbound slot. Returns false if it was already known.
    pub fn allocate_empty_slot(&mut self, table: &str, slot: SlotId) -> bool {
        let slots = self.tables.entry(table.to_string()).or_default();
        if slots.position(slot).is_some() {
            return false;
        }
        slots.slots.push((slot, None));
        true
    }

    /// Slot for a symbol, binding the first free slot if needed.
    ///
    /// `None` when every slot is taken; that is a normal outcome.
    pub fn bind_symbol(&mut self, table: &str, symbol: &str) -> Option<SlotId> {
        let slots = self.tables.get_mut(table)?;
        if let Some(slot) = slots.by_symbol.get(symbol) {
            return Some(*slot);
        }
        let free = slots.slots.iter().position(|(_, bound)| bound.is_none())?;
        Some(slots.bind_at(free, symbol))
    }

    /// Unbind a slot, keeping it available for another symbol.
    ///
    /// Returns the symbol that was bound, if any.
    pub fn free_slot(&mut self, table: &str, slot: SlotId) -> Option<String> {
        let slots = self.tables.get_mut(table)?;
        let index = slots.position(slot)?;
        slots.unbind_at(index)
    }

    /// Unbind and forget a slot.
    pub fn release_slot(&mut self, table: &str, slot: SlotId) -> Option<String> {
        let slots = self.tables.get_mut(table)?;
        let index = slots.position(slot)?;
        let symbol = slots.unbind_at(index);
        slots.slots.remove(index);
        symbol
    }

    /// Note a symbol seen in incoming data.
    pub fn record_seen(&mut self, table: &str, symbol: &str) {
        let slots = self.tables.entry(table.to_string()).or_default();
        if slots.seen_set.insert(symbol.to_string()) {
            slots.seen.push(symbol.to_string());
        }
    }

    /// Seen symbols not bound to any slot, oldest first.
    pub fn unbound_symbols(&self, table: &str) -> Vec<&str> {
        self.tables
            .get(table)
            .map(|slots| {
                slots
                    .seen
                    .iter()
                    .filter(|symbol| !slots.by_symbol.contains_key(*symbol))
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bind an unbound slot to the oldest unbound symbol that has a cached
    /// value for `column`, returning that symbol and value.
    pub fn cache_fill_candidate(
        &mut self,
        table: &str,
        slot: SlotId,
        cache: &DataCache,
        column: &str,
    ) -> Option<(String, Value)> {
        let slots = self.tables.get_mut(table)?;
        let index = slots.position(slot)?;
        if slots.slots[index].1.is_some() {
            return None;
        }

        let (symbol, value) = slots
            .seen
            .iter()
            .filter(|symbol| !slots.by_symbol.contains_key(*symbol))
            .find_map(|symbol| {
                cache
                    .get(table, symbol, column, HistoryOffset::CURRENT)
                    .map(|value| (symbol.clone(), value.clone()))
            })?;

        slots.bind_at(index, &symbol);
        Some((symbol, value))
    }

    pub fn symbol_of(&self, table: &str, slot: SlotId) -> Option<&str> {
        let slots = self.tables.get(table)?;
        let index = slots.position(slot)?;
        slots.slots[index].1.as_deref()
    }

    pub fn slot_of(&self, table: &str, symbol: &str) -> Option<SlotId> {
        self.tables.get(table)?.by_symbol.get(symbol).copied()
    }

    pub fn is_allocated(&self, table: &str, slot: SlotId) -> bool {
        self.tables
            .get(table)
            .map(|slots| slots.position(slot).is_some())
            .unwrap_or(false)
    }

    /// Number of allocated slots across all tables.
    pub fn slot_count(&self) -> usize {
        self.tables.values().map(|t| t.slots.len()).sum()
    }

    /// Number of bound slots across all tables.
    pub fn bound_count(&self) -> usize {
        self.tables.values().map(|t| t.by_symbol.len()).sum()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
