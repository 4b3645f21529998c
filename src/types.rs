//! Core types for the hub.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol that marks a subscription as a wildcard.
pub const WILDCARD_SYMBOL: &str = "`";

/// Unique identifier for a topic (one subscriber).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicId(pub u64);

impl fmt::Debug for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicId({})", self.0)
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a wildcard slot within a table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Parse a slot key such as `"7"`.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HubError::MalformedSlot(s.to_string()));
        }
        trimmed
            .parse::<u32>()
            .map(SlotId)
            .map_err(|_| HubError::MalformedSlot(s.to_string()))
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset into the rolling history of a coordinate.
///
/// Stored as a non-negative depth: `0` is the current value, `1` is the
/// value before it, and so on. The textual form is the negated depth
/// (`"0"`, `"-1"`, `"-2"`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct HistoryOffset(pub usize);

impl HistoryOffset {
    /// The current value.
    pub const CURRENT: HistoryOffset = HistoryOffset(0);

    /// Depth back from the current value.
    pub fn depth(self) -> usize {
        self.0
    }

    /// Parse an optional textual offset.
    ///
    /// `None` and the empty string mean "unset"; `"0"` selects the current
    /// value explicitly; negative integers select older values.
    pub fn parse(s: Option<&str>) -> Result<Option<Self>> {
        let Some(raw) = s.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let level: i64 = raw
            .parse()
            .map_err(|_| HubError::InvalidHistoryOffset(raw.to_string()))?;
        if level > 0 {
            return Err(HubError::InvalidHistoryOffset(raw.to_string()));
        }

        usize::try_from(level.unsigned_abs())
            .map(|depth| Some(HistoryOffset(depth)))
            .map_err(|_| HubError::InvalidHistoryOffset(raw.to_string()))
    }
}

impl fmt::Debug for HistoryOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "History(-{})", self.0)
    }
}

impl fmt::Display for HistoryOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "0")
        } else {
            write!(f, "-{}", self.0)
        }
    }
}

/// A single cell value flowing through the hub.
///
/// `Empty` doubles as the "no data" sentinel pushed when a history lookup
/// misses.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// The symbol half of a coordinate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolRef {
    /// A literal symbol known up front.
    Direct(String),
    /// A wildcard slot, bound to whatever symbol shows up on the wire.
    Wildcard(SlotId),
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolRef::Direct(symbol) => f.write_str(symbol),
            SymbolRef::Wildcard(slot) => write!(f, "{}#{}", WILDCARD_SYMBOL, slot),
        }
    }
}

/// One delivery of rows for a table.
///
/// Rows are positional: `rows[i][j]` is the value of `columns[j]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Batch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Batch {
    /// Create an empty batch for the given table and columns.
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
