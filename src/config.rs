//! Hub configuration.

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};

/// Names of the upstream functions used to steer the data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamFunctions {
    /// Adds symbols to an existing table subscription.
    /// Default: `.u.add`
    pub add: String,

    /// Subscribes a table (all symbols, or a given list).
    /// Default: `.u.sub`
    pub sub: String,

    /// Removes symbols from a table subscription.
    /// Default: `.u.del`
    pub del: String,
}

impl Default for UpstreamFunctions {
    fn default() -> Self {
        Self {
            add: ".u.add".to_string(),
            sub: ".u.sub".to_string(),
            del: ".u.del".to_string(),
        }
    }
}

/// Hub configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// History positions kept per coordinate besides the current value.
    /// Default: 1
    pub history_length: usize,

    /// Column holding the symbol identifier in incoming batches.
    /// Default: `sym`
    pub symbol_column: String,

    /// Upstream function names.
    pub functions: UpstreamFunctions,

    /// Buffered values per topic for channel-backed subscriptions.
    /// Default: 1000
    pub sink_buffer_size: usize,

    /// Upstream requests held until the connection layer drains them;
    /// requests beyond this are dropped and counted.
    /// Default: 1024
    pub upstream_buffer_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            history_length: 1,
            symbol_column: "sym".to_string(),
            functions: UpstreamFunctions::default(),
            sink_buffer_size: 1000,
            upstream_buffer_size: 1024,
        }
    }
}

/// A single recognized runtime parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigParam {
    HistoryLength,
    SymbolColumn,
    FunctionAdd,
    FunctionSub,
    FunctionDel,
}

impl ConfigParam {
    /// Resolve a parameter name, accepting the legacy spellings.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim() {
            "history.length" | "data.history.length" => Ok(ConfigParam::HistoryLength),
            "symbol.column.name" | "sym.column.name" => Ok(ConfigParam::SymbolColumn),
            "function.add" => Ok(ConfigParam::FunctionAdd),
            "function.sub" => Ok(ConfigParam::FunctionSub),
            "function.del" => Ok(ConfigParam::FunctionDel),
            other => Err(HubError::UnknownParameter(other.to_string())),
        }
    }
}

impl HubConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HubConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.symbol_column.trim().is_empty() {
            return Err(HubError::Config("symbol_column must not be empty".into()));
        }
        if self.sink_buffer_size == 0 {
            return Err(HubError::Config("sink_buffer_size must be positive".into()));
        }
        if self.upstream_buffer_size == 0 {
            return Err(HubError::Config("upstream_buffer_size must be positive".into()));
        }
        Ok(())
    }

    /// Apply a textual parameter update and return the effective value.
    pub fn apply(&mut self, param: ConfigParam, value: &str) -> Result<String> {
        let value = value.trim();
        let invalid = || HubError::InvalidParameter {
            param: format!("{:?}", param),
            value: value.to_string(),
        };

        match param {
            ConfigParam::HistoryLength => {
                self.history_length = value.parse().map_err(|_| invalid())?;
                Ok(self.history_length.to_string())
            }
            ConfigParam::SymbolColumn => {
                if value.is_empty() {
                    return Err(invalid());
                }
                self.symbol_column = value.to_string();
                Ok(self.symbol_column.clone())
            }
            ConfigParam::FunctionAdd | ConfigParam::FunctionSub | ConfigParam::FunctionDel => {
                if value.is_empty() {
                    return Err(invalid());
                }
                let slot = match param {
                    ConfigParam::FunctionAdd => &mut self.functions.add,
                    ConfigParam::FunctionSub => &mut self.functions.sub,
                    _ => &mut self.functions.del,
                };
                *slot = value.to_string();
                Ok(slot.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.history_length, 1);
        assert_eq!(config.symbol_column, "sym");
        assert_eq!(config.functions.add, ".u.add");
    }

    #[test]
    fn test_from_json_partial() {
        let config = HubConfig::from_json(r#"{"history_length": 5, "functions": {"sub": ".rt.sub"}}"#)
            .unwrap();
        assert_eq!(config.history_length, 5);
        assert_eq!(config.symbol_column, "sym");
        assert_eq!(config.functions.sub, ".rt.sub");
        assert_eq!(config.functions.del, ".u.del");
    }

    #[test]
    fn test_from_json_rejects_empty_symbol_column() {
        let result = HubConfig::from_json(r#"{"symbol_column": ""}"#);
        assert!(matches!(result, Err(HubError::Config(_))));
    }

    #[test]
    fn test_param_names() {
        assert_eq!(
            ConfigParam::from_name("data.history.length").unwrap(),
            ConfigParam::HistoryLength
        );
        assert_eq!(
            ConfigParam::from_name("sym.column.name").unwrap(),
            ConfigParam::SymbolColumn
        );
        assert!(matches!(
            ConfigParam::from_name("bogus"),
            Err(HubError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_apply() {
        let mut config = HubConfig::default();
        assert_eq!(config.apply(ConfigParam::HistoryLength, " 4 ").unwrap(), "4");
        assert_eq!(config.history_length, 4);

        assert!(config.apply(ConfigParam::HistoryLength, "-1").is_err());
        assert_eq!(config.history_length, 4);

        assert_eq!(config.apply(ConfigParam::FunctionDel, ".x.del").unwrap(), ".x.del");
        assert_eq!(config.functions.del, ".x.del");
    }
}
