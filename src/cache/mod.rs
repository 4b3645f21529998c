//! Value cache with a rolling history window.

mod data;
mod history;

pub use data::DataCache;
pub use history::History;
