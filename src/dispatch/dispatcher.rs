//! Applies incoming batches to the cache and pushes values to topics.

use crate::alias::AliasState;
use crate::cache::DataCache;
use crate::error::{HubError, Result};
use crate::topics::Subscription;
use crate::types::{Batch, Value};
use serde::Serialize;
use tracing::{debug, warn};

/// What happened while applying one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Rows applied to the cache.
    pub rows: usize,
    /// Rows dropped because their symbol cell was empty or blank text.
    pub skipped_rows: usize,
    /// Cells written to the cache.
    pub values: usize,
    /// Successful pushes.
    pub pushes: usize,
    /// Pushes a sink refused.
    pub failed_pushes: usize,
    /// Rows on a wildcard table that found no free slot.
    pub unbound_rows: usize,
}

/// Stateless batch coordinator.
///
/// Callers hold the alias lock for the whole call, which keeps batches of
/// one alias strictly ordered.
pub struct UpdateDispatcher<'a> {
    symbol_column: &'a str,
}

impl<'a> UpdateDispatcher<'a> {
    /// `symbol_column` names the column carrying the symbol identifier.
    pub fn new(symbol_column: &'a str) -> Self {
        Self { symbol_column }
    }

    /// Apply a batch to the alias state.
    ///
    /// The batch is validated up front; a malformed batch mutates nothing.
    pub fn dispatch(&self, state: &mut AliasState, batch: &Batch) -> Result<BatchReport> {
        let symbol_index = self.validate(batch)?;
        let table = batch.table.as_str();
        let mut report = BatchReport::default();

        for row in &batch.rows {
            let symbol = row[symbol_index].to_string();
            if symbol.trim().is_empty() {
                warn!(alias = %state.name, table, "row without symbol skipped");
                report.skipped_rows += 1;
                continue;
            }

            let slot = state.slots.bind_symbol(table, &symbol);
            state.slots.record_seen(table, &symbol);
            if slot.is_none() && state.wildcard.contains_table(table) {
                report.unbound_rows += 1;
            }

            for (column, value) in batch.columns.iter().zip(row) {
                state.cache.update(table, &symbol, column, value.clone());
                report.values += 1;

                if let Some(slot) = slot {
                    if let Some(subs) = state.wildcard.get_topics(table, &slot, column) {
                        deliver(subs, &state.cache, table, &symbol, column, value, &mut report);
                    }
                }

                if let Some(subs) = state.direct.get_topics(table, &symbol, column) {
                    deliver(subs, &state.cache, table, &symbol, column, value, &mut report);
                }
            }

            report.rows += 1;
        }

        state.batches += 1;
        state.rows += report.rows as u64;
        state.failed_pushes += report.failed_pushes as u64;

        debug!(
            alias = %state.name,
            table,
            rows = report.rows,
            pushes = report.pushes,
            failed = report.failed_pushes,
            "batch applied"
        );

        Ok(report)
    }

    fn validate(&self, batch: &Batch) -> Result<usize> {
        let malformed = |reason: String| HubError::MalformedBatch {
            table: batch.table.clone(),
            reason,
        };

        if batch.table.is_empty() {
            return Err(malformed("table name is empty".into()));
        }

        let symbol_index = batch
            .column_index(self.symbol_column)
            .ok_or_else(|| malformed(format!("missing symbol column {}", self.symbol_column)))?;

        if let Some((i, row)) = batch
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != batch.columns.len())
        {
            return Err(malformed(format!(
                "row {} has {} values, expected {}",
                i,
                row.len(),
                batch.columns.len()
            )));
        }

        Ok(symbol_index)
    }
}

/// Push a freshly written value to every subscription of a coordinate.
///
/// A failing sink is logged and counted; the remaining subscriptions still
/// receive the value.
fn deliver(
    subs: &[Subscription],
    cache: &DataCache,
    table: &str,
    symbol: &str,
    column: &str,
    current: &Value,
    report: &mut BatchReport,
) {
    for sub in subs {
        let value = match sub.history {
            None => current.clone(),
            Some(offset) => cache
                .get(table, symbol, column, offset)
                .cloned()
                .unwrap_or(Value::Empty),
        };

        match sub.push(value) {
            Ok(()) => report.pushes += 1,
            Err(e) => {
                warn!(topic = %sub.topic, table, symbol, column, error = %e, "push failed");
                report.failed_pushes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::{ChannelSink, PushError, SharedSink};
    use crate::types::{HistoryOffset, SlotId, TopicId};
    use crossbeam_channel::Receiver;
    use std::sync::Arc;

    fn channel_sub(id: u64, history: Option<HistoryOffset>) -> (Subscription, Receiver<Value>) {
        let (sink, receiver) = ChannelSink::bounded(16);
        (Subscription::new(TopicId(id), history, Arc::new(sink)), receiver)
    }

    fn trade(rows: Vec<(&str, i64)>) -> Batch {
        rows.into_iter().fold(
            Batch::new("trade", vec!["sym".into(), "price".into()]),
            |batch, (sym, price)| batch.with_row(vec![sym.into(), price.into()]),
        )
    }

    #[test]
    fn test_direct_push_and_cache() {
        let mut state = AliasState::new("feed", 1);
        let (sub, rx) = channel_sub(1, None);
        state.direct.add_topic("trade", "IBM".into(), "price", sub);

        let report = UpdateDispatcher::new("sym")
            .dispatch(&mut state, &trade(vec![("IBM", 100), ("MSFT", 30)]))
            .unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(report.values, 4);
        assert_eq!(report.pushes, 1);
        assert_eq!(rx.try_recv().unwrap(), Value::Int(100));
        assert_eq!(
            state.cache.current("trade", "MSFT", "price"),
            Some(&Value::Int(30))
        );
    }

    #[test]
    fn test_history_subscription_reads_previous() {
        let mut state = AliasState::new("feed", 2);
        let (prev, prev_rx) = channel_sub(1, Some(HistoryOffset(1)));
        let (deep, deep_rx) = channel_sub(2, Some(HistoryOffset(2)));
        state.direct.add_topic("trade", "IBM".into(), "price", prev);
        state.direct.add_topic("trade", "IBM".into(), "price", deep);

        let dispatcher = UpdateDispatcher::new("sym");
        dispatcher.dispatch(&mut state, &trade(vec![("IBM", 1)])).unwrap();
        dispatcher.dispatch(&mut state, &trade(vec![("IBM", 2)])).unwrap();

        assert_eq!(prev_rx.try_iter().collect::<Vec<_>>(), vec![Value::Empty, Value::Int(1)]);
        assert_eq!(deep_rx.try_iter().collect::<Vec<_>>(), vec![Value::Empty, Value::Empty]);
    }

    #[test]
    fn test_wildcard_binding_and_exhaustion() {
        let mut state = AliasState::new("feed", 1);
        let (sub, rx) = channel_sub(1, None);
        state.slots.allocate_empty_slot("trade", SlotId(0));
        state.wildcard.add_topic("trade", SlotId(0), "price", sub);

        let report = UpdateDispatcher::new("sym")
            .dispatch(&mut state, &trade(vec![("IBM", 100), ("AAPL", 50)]))
            .unwrap();

        assert_eq!(report.unbound_rows, 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Value::Int(100)]);
        assert_eq!(state.slots.symbol_of("trade", SlotId(0)), Some("IBM"));
        assert_eq!(
            state.cache.current("trade", "AAPL", "price"),
            Some(&Value::Int(50))
        );
        assert_eq!(state.slots.unbound_symbols("trade"), vec!["AAPL"]);
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let mut state = AliasState::new("feed", 1);
        let failing: SharedSink = Arc::new(|_: Value| Err::<(), _>(PushError::Rejected("boom".into())));
        state.direct.add_topic(
            "trade",
            "IBM".into(),
            "price",
            Subscription::new(TopicId(1), None, failing),
        );
        let (ok, rx) = channel_sub(2, None);
        state.direct.add_topic("trade", "IBM".into(), "price", ok);

        let report = UpdateDispatcher::new("sym")
            .dispatch(&mut state, &trade(vec![("IBM", 7)]))
            .unwrap();

        assert_eq!(report.failed_pushes, 1);
        assert_eq!(report.pushes, 1);
        assert_eq!(rx.try_recv().unwrap(), Value::Int(7));
        assert_eq!(state.stats().failed_pushes, 1);
    }

    #[test]
    fn test_malformed_batch_mutates_nothing() {
        let mut state = AliasState::new("feed", 1);
        let dispatcher = UpdateDispatcher::new("sym");

        let no_symbol = Batch::new("trade", vec!["price".into()]).with_row(vec![1i64.into()]);
        assert!(matches!(
            dispatcher.dispatch(&mut state, &no_symbol),
            Err(HubError::MalformedBatch { .. })
        ));

        let ragged = trade(vec![("IBM", 1)]).with_row(vec!["MSFT".into()]);
        assert!(matches!(
            dispatcher.dispatch(&mut state, &ragged),
            Err(HubError::MalformedBatch { .. })
        ));

        assert!(state.cache.is_empty());
        assert_eq!(state.stats().batches, 0);
    }

    #[test]
    fn test_empty_symbol_row_skipped() {
        let mut state = AliasState::new("feed", 1);
        let batch = Batch::new("trade", vec!["sym".into(), "price".into()])
            .with_row(vec![Value::Empty, 1i64.into()])
            .with_row(vec!["IBM".into(), 2i64.into()]);

        let report = UpdateDispatcher::new("sym").dispatch(&mut state, &batch).unwrap();
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.rows, 1);
        assert_eq!(state.cache.len(), 2);
    }

    #[test]
    fn test_blank_text_symbol_does_not_take_slot() {
        let mut state = AliasState::new("feed", 1);
        let (sub, rx) = channel_sub(1, None);
        state.slots.allocate_empty_slot("trade", SlotId(0));
        state.wildcard.add_topic("trade", SlotId(0), "price", sub);

        let report = UpdateDispatcher::new("sym")
            .dispatch(&mut state, &trade(vec![("", 1), ("  ", 2), ("IBM", 100)]))
            .unwrap();

        assert_eq!(report.skipped_rows, 2);
        assert_eq!(report.unbound_rows, 0);
        assert_eq!(state.slots.symbol_of("trade", SlotId(0)), Some("IBM"));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Value::Int(100)]);
        assert_eq!(state.cache.current("trade", "", "price"), None);
        assert!(state.slots.unbound_symbols("trade").is_empty());
    }
}
