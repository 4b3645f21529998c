//! Wildcard slots.
//!
//! A wildcard subscription names a slot id instead of a symbol. Slots are
//! bound first-come to symbols as they appear on the wire, and stay bound
//! until the last topic referencing them goes away.

mod registry;

pub use registry::SlotRegistry;
