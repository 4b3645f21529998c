//! Property tests for the cache, slot registry and topic map.

use proptest::prelude::*;
use rtdhub::{
    DataCache, HistoryOffset, PushError, SharedSink, SlotId, SlotRegistry, Subscription, TopicId,
    TopicMap, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

const TABLES: [&str; 2] = ["trade", "quote"];
const SYMBOLS: [&str; 4] = ["IBM", "MSFT", "AAPL", "GOOG"];
const COLUMNS: [&str; 2] = ["price", "size"];

fn null_sink() -> SharedSink {
    Arc::new(|_value: Value| Ok::<(), PushError>(()))
}

// --- Rolling History ---

proptest! {
    #[test]
    fn prop_rewind_matches_model(
        history_length in 0usize..5,
        writes in prop::collection::vec(any::<i64>(), 1..30),
    ) {
        let mut cache = DataCache::new(history_length);
        for value in &writes {
            cache.update("trade", "IBM", "price", Value::Int(*value));
        }

        let newest_first: Vec<i64> = writes.iter().rev().copied().collect();
        for depth in 0..=history_length + 2 {
            let expected = if depth <= history_length {
                newest_first.get(depth).map(|v| Value::Int(*v))
            } else {
                None
            };
            prop_assert_eq!(
                cache.get("trade", "IBM", "price", HistoryOffset(depth)).cloned(),
                expected,
                "depth {}", depth
            );
        }
    }

    #[test]
    fn prop_shrinking_history_keeps_newest(
        before in 1usize..6,
        after in 0usize..6,
        writes in prop::collection::vec(any::<i64>(), 1..20),
    ) {
        let mut cache = DataCache::new(before);
        for value in &writes {
            cache.update("trade", "IBM", "price", Value::Int(*value));
        }
        cache.set_history_length(after);

        let newest_first: Vec<i64> = writes.iter().rev().copied().collect();
        let kept = before.min(after);
        for depth in 0..=after {
            let expected = if depth <= kept {
                newest_first.get(depth).map(|v| Value::Int(*v))
            } else {
                None
            };
            prop_assert_eq!(
                cache.get("trade", "IBM", "price", HistoryOffset(depth)).cloned(),
                expected
            );
        }
    }
}

// --- Slot Binding ---

#[derive(Clone, Debug)]
enum SlotOp {
    Allocate(u32),
    Bind(usize),
    Free(u32),
    Release(u32),
}

fn slot_op() -> impl Strategy<Value = SlotOp> {
    prop_oneof![
        (0u32..4).prop_map(SlotOp::Allocate),
        (0usize..SYMBOLS.len()).prop_map(SlotOp::Bind),
        (0u32..4).prop_map(SlotOp::Free),
        (0u32..4).prop_map(SlotOp::Release),
    ]
}

proptest! {
    #[test]
    fn prop_slot_binding_is_injective(ops in prop::collection::vec(slot_op(), 0..60)) {
        let mut registry = SlotRegistry::new();

        for op in ops {
            match op {
                SlotOp::Allocate(slot) => {
                    registry.allocate_empty_slot("trade", SlotId(slot));
                }
                SlotOp::Bind(symbol) => {
                    let symbol = SYMBOLS[symbol];
                    let bound = registry.bind_symbol("trade", symbol);
                    registry.record_seen("trade", symbol);
                    if let Some(slot) = bound {
                        prop_assert!(registry.is_allocated("trade", slot));
                    }
                }
                SlotOp::Free(slot) => {
                    registry.free_slot("trade", SlotId(slot));
                    prop_assert_eq!(registry.symbol_of("trade", SlotId(slot)), None);
                }
                SlotOp::Release(slot) => {
                    registry.release_slot("trade", SlotId(slot));
                    prop_assert!(!registry.is_allocated("trade", SlotId(slot)));
                }
            }

            let mut bound = Vec::new();
            for slot in (0..4).map(SlotId) {
                if let Some(symbol) = registry.symbol_of("trade", slot) {
                    prop_assert!(registry.is_allocated("trade", slot));
                    prop_assert_eq!(registry.slot_of("trade", symbol), Some(slot));
                    bound.push(symbol.to_string());
                }
            }
            let count = bound.len();
            bound.sort();
            bound.dedup();
            prop_assert_eq!(bound.len(), count);
            prop_assert_eq!(registry.bound_count(), count);

            for symbol in SYMBOLS {
                if let Some(slot) = registry.slot_of("trade", symbol) {
                    prop_assert_eq!(registry.symbol_of("trade", slot), Some(symbol));
                }
            }
        }
    }
}

// --- Topic Uniqueness ---

#[derive(Clone, Debug)]
enum TopicOp {
    Add {
        topic: u64,
        table: usize,
        symbol: usize,
        column: usize,
    },
    Remove(u64),
}

fn topic_op() -> impl Strategy<Value = TopicOp> {
    prop_oneof![
        (0u64..8, 0..TABLES.len(), 0..SYMBOLS.len(), 0..COLUMNS.len()).prop_map(
            |(topic, table, symbol, column)| TopicOp::Add {
                topic,
                table,
                symbol,
                column,
            }
        ),
        (0u64..8).prop_map(TopicOp::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_topic_registered_once(ops in prop::collection::vec(topic_op(), 0..60)) {
        let mut map: TopicMap<String> = TopicMap::new();
        let mut model: HashMap<u64, (usize, usize, usize)> = HashMap::new();

        for op in ops {
            match op {
                TopicOp::Add { topic, table, symbol, column } => {
                    let sub = Subscription::new(TopicId(topic), None, null_sink());
                    prop_assert!(map.add_topic(
                        TABLES[table],
                        SYMBOLS[symbol].to_string(),
                        COLUMNS[column],
                        sub,
                    ));
                    model.insert(topic, (table, symbol, column));
                }
                TopicOp::Remove(topic) => {
                    let removed = map.remove_topic(TopicId(topic));
                    prop_assert_eq!(removed.is_some(), model.remove(&topic).is_some());
                }
            }

            prop_assert_eq!(map.len(), model.len());

            let mut occurrences: HashMap<u64, usize> = HashMap::new();
            for table in TABLES {
                for symbol in SYMBOLS {
                    for column in COLUMNS {
                        let subs = map
                            .get_topics(table, &symbol.to_string(), column)
                            .unwrap_or(&[]);
                        for sub in subs {
                            *occurrences.entry(sub.topic.0).or_default() += 1;
                        }
                    }
                }
            }

            for (topic, (table, symbol, column)) in &model {
                prop_assert_eq!(occurrences.get(topic).copied(), Some(1));
                let key = map.key_of(TopicId(*topic)).cloned();
                prop_assert!(key.is_some());
                let key = key.unwrap();
                prop_assert_eq!(key.table.as_str(), TABLES[*table]);
                prop_assert_eq!(key.key.as_str(), SYMBOLS[*symbol]);
                prop_assert_eq!(key.column.as_str(), COLUMNS[*column]);
            }
            prop_assert_eq!(occurrences.len(), model.len());
        }
    }
}
