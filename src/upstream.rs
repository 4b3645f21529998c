//! Requests the hub sends back to the data source.
//!
//! The hub decides what the source should stream based on live
//! subscriptions; the connection layer drains these requests from
//! [`Hub::upstream_requests`](crate::Hub::upstream_requests) and performs the
//! calls.

use serde::Serialize;

/// A call the data source should perform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamRequest {
    /// Add symbols to an existing table subscription.
    AddSymbols {
        alias: String,
        function: String,
        table: String,
        symbols: Vec<String>,
    },

    /// Subscribe a whole table (every symbol).
    SubscribeTable {
        alias: String,
        function: String,
        table: String,
    },

    /// Subscribe a table restricted to the given symbols.
    SubscribeSymbols {
        alias: String,
        function: String,
        table: String,
        symbols: Vec<String>,
    },

    /// Remove symbols from a table subscription.
    RemoveSymbols {
        alias: String,
        function: String,
        table: String,
        symbols: Vec<String>,
    },
}

impl UpstreamRequest {
    pub fn alias(&self) -> &str {
        match self {
            UpstreamRequest::AddSymbols { alias, .. }
            | UpstreamRequest::SubscribeTable { alias, .. }
            | UpstreamRequest::SubscribeSymbols { alias, .. }
            | UpstreamRequest::RemoveSymbols { alias, .. } => alias,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            UpstreamRequest::AddSymbols { table, .. }
            | UpstreamRequest::SubscribeTable { table, .. }
            | UpstreamRequest::SubscribeSymbols { table, .. }
            | UpstreamRequest::RemoveSymbols { table, .. } => table,
        }
    }

    /// Name of the upstream function to call.
    pub fn function(&self) -> &str {
        match self {
            UpstreamRequest::AddSymbols { function, .. }
            | UpstreamRequest::SubscribeTable { function, .. }
            | UpstreamRequest::SubscribeSymbols { function, .. }
            | UpstreamRequest::RemoveSymbols { function, .. } => function,
        }
    }
}
