//! Logical fields, the static alias table, and column resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::table::RawTable;
use crate::error::{ConfigError, SchemaError};

/// A bar field the loader knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
    SignalLevel,
    Polarity,
    Intensity,
    Dominance,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Self::Timestamp,
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Volume,
        Self::SignalLevel,
        Self::Polarity,
        Self::Intensity,
        Self::Dominance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
            Self::SignalLevel => "signal_level",
            Self::Polarity => "polarity",
            Self::Intensity => "intensity",
            Self::Dominance => "dominance",
        }
    }

    /// Timestamp, OHLCV and the signal level must resolve; PAD dimensions may not.
    pub fn is_required(self) -> bool {
        !matches!(self, Self::Polarity | Self::Intensity | Self::Dominance)
    }

    /// Accepted column names, in lookup order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Timestamp => &["timestamp", "datetime", "DateTime", "date_time", "date", "time", "时间"],
            Self::Open => &["open", "开盘价"],
            Self::High => &["high", "最高价"],
            Self::Low => &["low", "最低价"],
            Self::Close => &["close", "收盘价"],
            Self::Volume => &["volume", "vol", "成交量"],
            Self::SignalLevel => &[
                "signal_level",
                "Signal_Level",
                "signal量_等级",
                "信号量_等级",
                "信号量等级",
            ],
            Self::Polarity => &["polarity", "极性"],
            Self::Intensity => &["intensity", "强度"],
            Self::Dominance => &["dominance", "支配维度"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s.trim())
            .ok_or_else(|| ConfigError::InvalidSettings(format!("unknown column field `{s}`")))
    }
}

/// Caller-supplied column names that take precedence over the alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping(BTreeMap<Field, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, column: impl Into<String>) -> Self {
        self.0.insert(field, column.into());
        self
    }

    /// Build from `field name -> column name` pairs, as found in a config file.
    pub fn from_names<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ConfigError> {
        let mut mapping = Self::new();
        for (field, column) in pairs {
            mapping = mapping.with(field.parse::<Field>()?, column);
        }
        Ok(mapping)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which table column feeds each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns(BTreeMap<Field, String>);

impl ResolvedColumns {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, c)| (*f, c.as_str()))
    }
}

/// Match every field to a column: mapping override, exact alias, then
/// case-insensitive alias.
pub fn resolve(table: &RawTable, mapping: &ColumnMapping) -> Result<ResolvedColumns, SchemaError> {
    let names = table.column_names();
    let mut resolved = BTreeMap::new();

    for field in Field::ALL {
        if let Some(name) = mapping.get(field) {
            if !names.contains(&name) {
                return Err(SchemaError::MissingColumn {
                    field: field.as_str(),
                    tried: vec![name.to_string()],
                });
            }
            resolved.insert(field, name.to_string());
            continue;
        }

        let aliases = field.aliases();
        let exact = aliases.iter().find(|a| names.contains(a)).copied();
        let found = exact.or_else(|| {
            names
                .iter()
                .find(|n| aliases.iter().any(|a| a.to_lowercase() == n.trim().to_lowercase()))
                .copied()
        });

        match found {
            Some(name) => {
                resolved.insert(field, name.to_string());
            }
            None if field.is_required() => {
                return Err(SchemaError::MissingColumn {
                    field: field.as_str(),
                    tried: aliases.iter().map(|a| a.to_string()).collect(),
                });
            }
            None => {}
        }
    }
    Ok(ResolvedColumns(resolved))
}
