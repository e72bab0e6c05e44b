//! Error taxonomy for loading, configuring and simulating a backtest.
//!
//! - `SchemaError`: the input table cannot be turned into bars.
//! - `ConfigError`: strategy or run parameters are invalid or inconsistent.
//! - `DataIntegrityError`: bars exist but their OHLC relationships are broken.
//! - `SimulationError`: an internal invariant was violated mid-run.
//!
//! `BacktestError` unifies them for callers that drive a whole run.

use chrono::NaiveDateTime;

/// The input table is missing columns or holds uninterpretable values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing column for `{field}` (tried: {})", .tried.join(", "))]
    MissingColumn {
        field: &'static str,
        tried: Vec<String>,
    },

    #[error("column `{column}` row {row}: cannot read {value:?} as {expected}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("column `{column}` has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate timestamp {timestamp} at row {row}")]
    DuplicateTimestamp { row: usize, timestamp: NaiveDateTime },

    #[error("timestamp {current} at row {row} is earlier than the previous row ({previous})")]
    NonMonotonicTimestamp {
        row: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

impl SchemaError {
    /// Column (or logical field) the error points at, when there is one.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::MissingColumn { field, .. } => Some(field),
            Self::InvalidValue { column, .. } | Self::RaggedColumn { column, .. } => Some(column),
            Self::DuplicateTimestamp { .. } | Self::NonMonotonicTimestamp { .. } => None,
        }
    }
}

/// Invalid or inconsistent strategy / run parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown strategy `{0}`")]
    UnknownStrategy(String),

    #[error("strategy `{strategy}` does not accept parameter `{param}`")]
    UnknownParam { strategy: String, param: String },

    #[error("parameter `{param}` = {value}: {reason}")]
    InvalidParam {
        param: String,
        value: f64,
        reason: &'static str,
    },

    #[error("strategy `{strategy}`: {detail}")]
    Inconsistent { strategy: String, detail: String },

    #[error("bar sequence is empty")]
    EmptyBars,

    #[error("invalid run settings: {0}")]
    InvalidSettings(String),
}

/// One bar whose OHLC values do not describe a valid price range.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcViolation {
    pub index: usize,
    pub reason: &'static str,
}

/// Malformed OHLC relationships, reported for every offending bar at once.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} bar(s) with inconsistent OHLC at indices {:?}", self.indices().len(), self.indices())]
pub struct DataIntegrityError {
    pub violations: Vec<OhlcViolation>,
}

impl DataIntegrityError {
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.violations.iter().map(|v| v.index).collect();
        indices.dedup();
        indices
    }
}

/// Internal invariant violation. Always a logic defect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("bar {bar_index}: open requested while a {direction} position is live")]
    PositionAlreadyOpen {
        bar_index: usize,
        direction: &'static str,
    },

    #[error("bar {bar_index}: close requested with no open position")]
    NoOpenPosition { bar_index: usize },

    #[error("bar {bar_index}: position size {size} is not a positive finite number")]
    InvalidSize { bar_index: usize, size: f64 },

    #[error("bar {bar_index}: equity became non-finite ({equity})")]
    NonFiniteEquity { bar_index: usize, equity: f64 },
}

/// Any failure of a single backtest run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data integrity error: {0}")]
    DataIntegrity(#[from] DataIntegrityError),

    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("run exceeded its {budget_ms} ms time budget after {bars_processed} bars")]
    Timeout { budget_ms: u128, bars_processed: usize },
}

impl BacktestError {
    /// Stable label for reports and failed optimizer rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::Config(_) => "config",
            Self::DataIntegrity(_) => "data_integrity",
            Self::Simulation(_) => "simulation",
            Self::Timeout { .. } => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_aliases_tried() {
        let err = SchemaError::MissingColumn {
            field: "signal_level",
            tried: vec!["signal_level".into(), "Signal_Level".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("signal_level"));
        assert!(msg.contains("Signal_Level"));
        assert_eq!(err.column(), Some("signal_level"));
    }

    #[test]
    fn integrity_error_lists_every_index() {
        let err = DataIntegrityError {
            violations: vec![
                OhlcViolation { index: 2, reason: "high < low" },
                OhlcViolation { index: 2, reason: "high < close" },
                OhlcViolation { index: 7, reason: "high < low" },
            ],
        };
        assert_eq!(err.indices(), vec![2, 7]);
        assert_eq!(
            err.to_string(),
            "2 bar(s) with inconsistent OHLC at indices [2, 7]"
        );
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(BacktestError::from(ConfigError::EmptyBars).kind(), "config");
        let sim = SimulationError::NoOpenPosition { bar_index: 3 };
        assert_eq!(BacktestError::from(sim).kind(), "simulation");
        let timeout = BacktestError::Timeout {
            budget_ms: 10,
            bars_processed: 256,
        };
        assert_eq!(timeout.kind(), "timeout");
    }
}
