//! Batch dispatch: cache writes followed by topic pushes.

mod dispatcher;

pub use dispatcher::{BatchReport, UpdateDispatcher};
