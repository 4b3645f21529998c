//! # rtdhub
//!
//! A real-time distribution hub that fans out updates from streaming
//! tabular sources to many subscribers, keyed by `(table, symbol, column)`.
//!
//! ## Core Concepts
//!
//! - **Aliases**: One logical data-source connection; all state is scoped to it
//! - **Topics**: Subscribers receiving pushed values through a sink
//! - **History**: A short rolling window of past values per coordinate
//! - **Wildcard slots**: Subscriptions that bind to symbols first seen on the wire
//!
//! ## Example
//!
//! ```ignore
//! use rtdhub::{Batch, Hub, HubConfig, SubscribeRequest};
//!
//! let hub = Hub::new(HubConfig::default())?;
//!
//! // A cell watching IBM's price, and one watching whatever lands in slot 0
//! let ibm = hub.subscribe_channel(&SubscribeRequest::direct("feed", "trade", "IBM", "price"))?;
//! let any = hub.subscribe_channel(&SubscribeRequest::wildcard("feed", "trade", 0, "price"))?;
//!
//! // Rows arrive from the data source
//! let batch = Batch::new("trade", vec!["sym".into(), "price".into()])
//!     .with_row(vec!["IBM".into(), 100i64.into()]);
//! hub.on_batch("feed", &batch)?;
//!
//! assert_eq!(ibm.recv()?, 100i64.into());
//! assert_eq!(any.recv()?, 100i64.into());
//! ```

mod alias;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hub;
pub mod request;
pub mod slots;
pub mod topics;
pub mod types;
pub mod upstream;

// Re-exports
pub use alias::{AliasState, AliasStats};
pub use cache::{DataCache, History};
pub use config::{ConfigParam, HubConfig, UpstreamFunctions};
pub use dispatch::{BatchReport, UpdateDispatcher};
pub use error::{HubError, Result};
pub use hub::Hub;
pub use request::{Coordinate, SubscribeRequest};
pub use slots::SlotRegistry;
pub use topics::{
    ChannelSink, MapKey, PushError, SharedSink, Subscription, SymbolKey, TopicHandle, TopicMap,
    TopicSink,
};
pub use types::*;
pub use upstream::UpstreamRequest;
