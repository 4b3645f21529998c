//! Topic bookkeeping.
//!
//! A topic is one subscriber: an identity ([`TopicId`](crate::TopicId)) plus
//! a sink that receives pushed values. This module provides:
//! - [`TopicMap`], the bidirectional topic/coordinate index
//! - [`TopicSink`] and the channel-backed [`ChannelSink`]
//! - [`TopicHandle`] for consuming a channel-backed topic
//!
//! # Example
//!
//! ```ignore
//! let handle = hub.subscribe_channel(&SubscribeRequest::direct("feed", "trade", "IBM", "price"))?;
//!
//! while let Ok(value) = handle.recv() {
//!     println!("price: {}", value);
//! }
//! ```

mod map;
mod types;

pub use map::{MapKey, SymbolKey, TopicMap};
pub use types::{ChannelSink, PushError, SharedSink, Subscription, TopicHandle, TopicSink};
