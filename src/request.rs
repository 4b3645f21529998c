//! Subscription requests and their validation.

use crate::error::{HubError, Result};
use crate::types::{HistoryOffset, SlotId, SymbolRef, WILDCARD_SYMBOL};
use serde::{Deserialize, Serialize};

/// A raw subscription request as received from the subscriber side.
///
/// All parts are text; [`SubscribeRequest::validate`] turns them into a
/// checked [`Coordinate`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub alias: String,
    pub table: String,
    /// A symbol, or [`WILDCARD_SYMBOL`] for a wildcard subscription.
    pub symbol: String,
    pub column: String,
    /// `None`/`"0"` for the current value, `"-1"` for the previous one, ...
    #[serde(default)]
    pub history: Option<String>,
    /// Slot id; required for wildcard subscriptions.
    #[serde(default)]
    pub slot: Option<String>,
}

impl SubscribeRequest {
    /// Subscribe to a literal symbol.
    pub fn direct(
        alias: impl Into<String>,
        table: impl Into<String>,
        symbol: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
            symbol: symbol.into(),
            column: column.into(),
            history: None,
            slot: None,
        }
    }

    /// Subscribe to whatever symbol gets bound to `slot`.
    pub fn wildcard(
        alias: impl Into<String>,
        table: impl Into<String>,
        slot: u32,
        column: impl Into<String>,
    ) -> Self {
        Self {
            alias: alias.into(),
            table: table.into(),
            symbol: WILDCARD_SYMBOL.to_string(),
            column: column.into(),
            history: None,
            slot: Some(slot.to_string()),
        }
    }

    /// Read from history instead of the current value.
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.history = Some(history.into());
        self
    }

    /// Build a request from positional parts:
    /// `alias, table, symbol, column[, history[, slot]]`.
    pub fn from_parts(parts: &[&str]) -> Result<Self> {
        let part = |i: usize| parts.get(i).map(|s| s.to_string()).unwrap_or_default();
        if parts.len() < 4 {
            return Err(match parts.len() {
                0 => HubError::MissingAlias,
                1 => HubError::MissingTable,
                2 => HubError::MissingSymbol,
                _ => HubError::MissingColumn,
            });
        }

        Ok(Self {
            alias: part(0),
            table: part(1),
            symbol: part(2),
            column: part(3),
            history: parts.get(4).map(|s| s.to_string()),
            slot: parts.get(5).map(|s| s.to_string()),
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.symbol == WILDCARD_SYMBOL
    }

    /// Check every part; no state is touched on failure.
    pub fn validate(&self) -> Result<Coordinate> {
        if self.is_wildcard() && self.slot.is_none() {
            return Err(HubError::MissingSlot(self.table.clone()));
        }
        let slot = self.slot.as_deref().map(SlotId::parse).transpose()?;

        if self.alias.trim().is_empty() {
            return Err(HubError::MissingAlias);
        }
        if self.table.is_empty() {
            return Err(HubError::MissingTable);
        }
        if self.symbol.is_empty() {
            return Err(HubError::MissingSymbol);
        }
        if self.column.is_empty() {
            return Err(HubError::MissingColumn);
        }

        let history = HistoryOffset::parse(self.history.as_deref())?;

        let symbol = match slot {
            Some(slot) if self.is_wildcard() => SymbolRef::Wildcard(slot),
            _ => SymbolRef::Direct(self.symbol.clone()),
        };

        Ok(Coordinate {
            alias: self.alias.trim().to_string(),
            table: self.table.clone(),
            symbol,
            column: self.column.clone(),
            history,
        })
    }
}

/// A validated subscription target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coordinate {
    pub alias: String,
    pub table: String,
    pub symbol: SymbolRef,
    pub column: String,
    pub history: Option<HistoryOffset>,
}
