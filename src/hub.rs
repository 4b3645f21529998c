//! Main Hub struct tying all components together.

use crate::alias::{AliasState, AliasStats};
use crate::cache::DataCache;
use crate::config::{ConfigParam, HubConfig, UpstreamFunctions};
use crate::dispatch::{BatchReport, UpdateDispatcher};
use crate::error::{HubError, Result};
use crate::request::{Coordinate, SubscribeRequest};
use crate::topics::{ChannelSink, SharedSink, Subscription, TopicHandle};
use crate::types::{Batch, HistoryOffset, SlotId, SymbolRef, TopicId, Value};
use crate::upstream::UpstreamRequest;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type AliasHandle = Arc<Mutex<AliasState>>;

/// The fan-out hub.
///
/// Provides a unified interface for:
/// - Subscribing and unsubscribing topics
/// - Applying batches from data sources
/// - Tracking connection lifecycle per alias
/// - Runtime configuration
pub struct Hub {
    /// Current configuration.
    config: RwLock<HubConfig>,

    /// Serializes `configure` so history changes reach aliases in order.
    config_lock: Mutex<()>,

    /// Per-alias state.
    aliases: RwLock<HashMap<String, AliasHandle>>,

    /// Topic to alias, for unsubscribe.
    routes: RwLock<HashMap<TopicId, String>>,

    /// Counter for generating topic IDs.
    next_topic: AtomicU64,

    upstream_tx: Sender<UpstreamRequest>,
    upstream_rx: Receiver<UpstreamRequest>,

    /// Upstream requests dropped because nobody drained the channel.
    upstream_dropped: AtomicU64,
}

impl Hub {
    /// Create a hub with the given configuration.
    pub fn new(config: HubConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: HubConfig) -> Self {
        let (upstream_tx, upstream_rx) = bounded(config.upstream_buffer_size);
        Self {
            config: RwLock::new(config),
            config_lock: Mutex::new(()),
            aliases: RwLock::new(HashMap::new()),
            routes: RwLock::new(HashMap::new()),
            next_topic: AtomicU64::new(1),
            upstream_tx,
            upstream_rx,
            upstream_dropped: AtomicU64::new(0),
        }
    }

    // --- Subscriber Side ---

    /// Register a topic.
    ///
    /// If the cache already holds a value for the coordinate, the sink
    /// receives it immediately. Invalid requests are rejected before any
    /// state changes.
    pub fn subscribe(&self, request: &SubscribeRequest, sink: SharedSink) -> Result<TopicId> {
        let coord = request.validate()?;
        let functions = self.config.read().functions.clone();
        let topic = TopicId(self.next_topic.fetch_add(1, Ordering::SeqCst));
        let sub = Subscription::new(topic, coord.history, sink);

        self.with_live_alias(&coord.alias, |state| {
            match &coord.symbol {
                SymbolRef::Direct(symbol) => {
                    self.subscribe_direct(state, &coord, symbol, sub, &functions)
                }
                SymbolRef::Wildcard(slot) => {
                    self.subscribe_wildcard(state, &coord, *slot, sub, &functions)
                }
            }
            self.routes.write().insert(topic, coord.alias.clone());
        });

        debug!(%topic, alias = %coord.alias, table = %coord.table, symbol = %coord.symbol, column = %coord.column, "subscribed");
        Ok(topic)
    }

    /// Register a topic that receives values on a bounded channel.
    pub fn subscribe_channel(&self, request: &SubscribeRequest) -> Result<TopicHandle> {
        let buffer_size = self.config.read().sink_buffer_size;
        let (sink, receiver) = ChannelSink::bounded(buffer_size);
        let id = self.subscribe(request, Arc::new(sink))?;
        Ok(TopicHandle { id, receiver })
    }

    fn subscribe_direct(
        &self,
        state: &mut AliasState,
        coord: &Coordinate,
        symbol: &str,
        sub: Subscription,
        functions: &UpstreamFunctions,
    ) {
        let table = coord.table.as_str();
        let first_for_symbol = !state.direct.contains_symbol(table, &symbol.to_string())
            && !state.wildcard.contains_table(table);

        push_cached(&sub, &state.cache, table, symbol, &coord.column);
        state
            .direct
            .add_topic(table, symbol.to_string(), &coord.column, sub);

        if first_for_symbol && state.connected {
            self.send_upstream(UpstreamRequest::AddSymbols {
                alias: state.name.clone(),
                function: functions.add.clone(),
                table: table.to_string(),
                symbols: vec![symbol.to_string()],
            });
        }
    }

    fn subscribe_wildcard(
        &self,
        state: &mut AliasState,
        coord: &Coordinate,
        slot: SlotId,
        sub: Subscription,
        functions: &UpstreamFunctions,
    ) {
        let table = coord.table.as_str();
        let column = coord.column.as_str();
        let first_for_table = !state.wildcard.contains_table(table);

        state.slots.allocate_empty_slot(table, slot);
        state.wildcard.add_topic(table, slot, column, sub.clone());

        match state.slots.symbol_of(table, slot).map(str::to_string) {
            Some(symbol) => push_cached(&sub, &state.cache, table, &symbol, column),
            None => {
                if let Some((symbol, _)) =
                    state
                        .slots
                        .cache_fill_candidate(table, slot, &state.cache, column)
                {
                    debug!(alias = %state.name, table, %slot, symbol = %symbol, "slot filled from cache");
                    if let Some(subs) = state.wildcard.get_topics(table, &slot, column) {
                        for s in subs {
                            push_cached(s, &state.cache, table, &symbol, column);
                        }
                    }
                }
            }
        }

        if first_for_table && state.connected {
            self.send_upstream(UpstreamRequest::SubscribeTable {
                alias: state.name.clone(),
                function: functions.sub.clone(),
                table: table.to_string(),
            });
        }
    }

    /// Remove a topic. Returns false if it was not registered.
    ///
    /// Once this returns the topic receives no further values. Removing the
    /// last topic of a wildcard slot releases the slot.
    pub fn unsubscribe(&self, topic: TopicId) -> bool {
        let Some(alias) = self.routes.write().remove(&topic) else {
            return false;
        };
        let Some(handle) = self.existing_alias(&alias) else {
            return false;
        };

        let mut state = handle.lock();
        if state.closed {
            return false;
        }

        if let Some(key) = state.direct.remove_topic(topic) {
            let last_for_symbol = state.direct.topic_count(&key.table, &key.key) == 0;
            if last_for_symbol && state.connected && !state.wildcard.contains_table(&key.table) {
                let function = self.config.read().functions.del.clone();
                self.send_upstream(UpstreamRequest::RemoveSymbols {
                    alias: alias.clone(),
                    function,
                    table: key.table.clone(),
                    symbols: vec![key.key.clone()],
                });
            }
        } else if let Some(key) = state.wildcard.remove_topic(topic) {
            if !state.wildcard.contains_symbol(&key.table, &key.key) {
                let freed = state.slots.release_slot(&key.table, key.key);
                debug!(%alias, table = %key.table, slot = %key.key, symbol = ?freed, "slot released");
            }
        } else {
            return false;
        }

        debug!(%topic, %alias, "unsubscribed");
        true
    }

    // --- Data Source Side ---

    /// Apply a batch of rows for an alias.
    ///
    /// The whole batch runs under the alias lock, so batches of one alias
    /// never interleave. Different aliases proceed in parallel.
    pub fn on_batch(&self, alias: &str, batch: &Batch) -> Result<BatchReport> {
        if alias.trim().is_empty() {
            return Err(HubError::MissingAlias);
        }
        let symbol_column = self.config.read().symbol_column.clone();

        let handle = self.alias_handle(alias);
        let mut state = handle.lock();
        if state.closed {
            warn!(alias, table = %batch.table, "batch abandoned, alias disconnected");
            return Err(HubError::AliasClosed(alias.to_string()));
        }

        UpdateDispatcher::new(&symbol_column).dispatch(&mut state, batch)
    }

    /// Mark an alias connected and replay upstream subscriptions.
    pub fn on_connected(&self, alias: &str) {
        let functions = self.config.read().functions.clone();

        self.with_live_alias(alias, |state| {
            state.connected = true;

            let mut wildcard_tables = state.wildcard.tables();
            wildcard_tables.sort();
            for table in &wildcard_tables {
                self.send_upstream(UpstreamRequest::SubscribeTable {
                    alias: state.name.clone(),
                    function: functions.sub.clone(),
                    table: table.clone(),
                });
            }

            let mut direct_tables = state.direct.tables();
            direct_tables.sort();
            for table in direct_tables {
                if state.wildcard.contains_table(&table) {
                    continue;
                }
                let mut symbols = state.direct.symbols(&table);
                symbols.sort();
                self.send_upstream(UpstreamRequest::SubscribeSymbols {
                    alias: state.name.clone(),
                    function: functions.sub.clone(),
                    table,
                    symbols,
                });
            }
        });

        info!(alias, "alias connected");
    }

    /// Tear down everything held for an alias.
    ///
    /// A batch already running finishes against the old state first; any
    /// batch that locks afterwards is abandoned.
    pub fn on_disconnected(&self, alias: &str) -> bool {
        let Some(handle) = self.aliases.write().remove(alias) else {
            return false;
        };

        let mut state = handle.lock();
        let topics = state.clear();
        state.closed = true;

        let mut routes = self.routes.write();
        for topic in &topics {
            routes.remove(topic);
        }

        info!(alias, topics = topics.len(), "alias disconnected");
        true
    }

    // --- Configuration ---

    /// Set a runtime parameter and return its effective value.
    ///
    /// Recognized: `history.length`, `symbol.column.name`, `function.add`,
    /// `function.sub`, `function.del`.
    pub fn configure(&self, param: &str, value: &str) -> Result<String> {
        let param = ConfigParam::from_name(param)?;
        let _lock = self.config_lock.lock();

        let (effective, history_length) = {
            let mut config = self.config.write();
            let effective = config.apply(param, value)?;
            (effective, config.history_length)
        };

        if param == ConfigParam::HistoryLength {
            for handle in self.aliases.read().values() {
                handle.lock().cache.set_history_length(history_length);
            }
        }

        info!(?param, value = %effective, "configuration changed");
        Ok(effective)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> HubConfig {
        self.config.read().clone()
    }

    pub fn history_length(&self) -> usize {
        self.config.read().history_length
    }

    // --- Queries ---

    /// Cached value for a coordinate.
    ///
    /// `Ok(None)` for anything unknown; errors only for a malformed history
    /// offset.
    pub fn cached_value(
        &self,
        alias: &str,
        table: &str,
        symbol: &str,
        column: &str,
        history: Option<&str>,
    ) -> Result<Option<Value>> {
        let offset = HistoryOffset::parse(history)?.unwrap_or_default();
        let Some(handle) = self.existing_alias(alias) else {
            return Ok(None);
        };
        let state = handle.lock();
        Ok(state.cache.get(table, symbol, column, offset).cloned())
    }

    /// Symbol currently bound to a wildcard slot.
    pub fn slot_binding(&self, alias: &str, table: &str, slot: SlotId) -> Option<String> {
        let handle = self.existing_alias(alias)?;
        let state = handle.lock();
        state.slots.symbol_of(table, slot).map(str::to_string)
    }

    pub fn alias_stats(&self, alias: &str) -> Option<AliasStats> {
        self.existing_alias(alias).map(|handle| handle.lock().stats())
    }

    /// Known aliases, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aliases.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total registered topics across all aliases.
    pub fn topic_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Receiver for requests the data source should act on.
    ///
    /// The channel is bounded by `upstream_buffer_size`; see
    /// [`Hub::upstream_dropped`].
    pub fn upstream_requests(&self) -> Receiver<UpstreamRequest> {
        self.upstream_rx.clone()
    }

    /// Upstream requests dropped because the channel was full.
    pub fn upstream_dropped(&self) -> u64 {
        self.upstream_dropped.load(Ordering::Relaxed)
    }

    // --- Internal ---

    fn existing_alias(&self, alias: &str) -> Option<AliasHandle> {
        self.aliases.read().get(alias).cloned()
    }

    fn alias_handle(&self, alias: &str) -> AliasHandle {
        if let Some(handle) = self.existing_alias(alias) {
            return handle;
        }

        let mut aliases = self.aliases.write();
        let handle = aliases.entry(alias.to_string()).or_insert_with(|| {
            let history_length = self.config.read().history_length;
            info!(alias, history_length, "alias created");
            Arc::new(Mutex::new(AliasState::new(alias, history_length)))
        });
        Arc::clone(handle)
    }

    /// Run `f` against the alias state, creating it if needed and retrying
    /// if it was torn down between lookup and lock.
    fn with_live_alias<T>(&self, alias: &str, f: impl FnOnce(&mut AliasState) -> T) -> T {
        loop {
            let handle = self.alias_handle(alias);
            let mut state = handle.lock();
            if state.closed {
                continue;
            }
            return f(&mut state);
        }
    }

    fn send_upstream(&self, request: UpstreamRequest) {
        debug!(?request, "upstream request");
        if let Err(e) = self.upstream_tx.try_send(request) {
            self.upstream_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(request = ?e.into_inner(), "upstream channel full, request dropped");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::with_valid_config(HubConfig::default())
    }
}

/// Push the cached value a subscription would currently show, if any.
fn push_cached(sub: &Subscription, cache: &DataCache, table: &str, symbol: &str, column: &str) {
    let offset = sub.history.unwrap_or_default();
    let Some(value) = cache.get(table, symbol, column, offset).cloned() else {
        return;
    };
    if let Err(e) = sub.push(value) {
        warn!(topic = %sub.topic, table, symbol, column, error = %e, "initial push failed");
    }
}
