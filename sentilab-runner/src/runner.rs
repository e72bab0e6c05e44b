//! Backtest runner: wires together data loading, the engine and metrics.
//!
//! Three entry points:
//! - `load_dataset()`: file (or synthetic) → `Dataset`, done once per invocation.
//! - `backtest()`: one strategy over a loaded dataset.
//! - `compare()`: several strategies over the same dataset, ranked.
//!
//! Grid search lives in [`crate::optimizer`]; it takes the same `Dataset`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentilab_core::data::{load_bars, read_table, synthetic_bars, ColumnMapping, DatasetMeta, ReadError};
use sentilab_core::domain::DatasetHash;
use sentilab_core::engine::{run, RunSettings};
use sentilab_core::{BacktestError, BacktestResult, BarSeries, StrategyConfig};

use crate::analyzer::{self, ComparisonRow};
use crate::config::DataSource;
use crate::fitness::FitnessMetric;
use crate::metrics::PerformanceMetrics;
use crate::optimizer::{GridError, OptimizeError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("read error: {0}")]
    Read(#[from] ReadError),
    #[error(transparent)]
    Backtest(#[from] BacktestError),
    #[error("grid error: {0}")]
    Grid(#[from] GridError),
}

impl From<OptimizeError> for RunError {
    fn from(err: OptimizeError) -> Self {
        match err {
            OptimizeError::Grid(e) => Self::Grid(e),
            OptimizeError::Backtest(e) => Self::Backtest(e),
        }
    }
}

impl RunError {
    /// Stable error kind label, as printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read(ReadError::Schema(_)) => "schema",
            Self::Read(_) => "input",
            Self::Backtest(e) => e.kind(),
            Self::Grid(_) => "config",
        }
    }

    /// Offending column or bar indices, when the error names any.
    pub fn location(&self) -> Option<String> {
        let schema = match self {
            Self::Read(ReadError::Schema(e)) | Self::Backtest(BacktestError::Schema(e)) => e,
            Self::Backtest(BacktestError::DataIntegrity(e)) => {
                return Some(format!("bar indices {:?}", e.indices()));
            }
            _ => return None,
        };
        schema.column().map(|c| format!("column `{c}`"))
    }
}

/// Bars plus what is known about where they came from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub bars: BarSeries,
    /// File path, or `synthetic(seed=…)`.
    pub source: String,
    pub meta: Option<DatasetMeta>,
    pub dropped_rows: usize,
    pub hash: DatasetHash,
}

/// Load bars from a file or generate a synthetic series.
pub fn load_dataset(source: &DataSource, mapping: &ColumnMapping) -> Result<Dataset, RunError> {
    let dataset = match source {
        DataSource::File(path) => {
            let table = read_table(path)?;
            let loaded = load_bars(&table, mapping).map_err(BacktestError::from)?;
            Dataset {
                hash: loaded.bars.dataset_hash(),
                bars: loaded.bars,
                source: path.display().to_string(),
                meta: DatasetMeta::from_path(path),
                dropped_rows: loaded.dropped_rows,
            }
        }
        DataSource::Synthetic(spec) => {
            let bars = synthetic_bars(spec).map_err(BacktestError::from)?;
            Dataset {
                hash: bars.dataset_hash(),
                bars,
                source: format!("synthetic(seed={})", spec.seed),
                meta: None,
                dropped_rows: 0,
            }
        }
    };
    tracing::info!(
        source = %dataset.source,
        bars = dataset.bars.len(),
        dropped = dataset.dropped_rows,
        granularity = dataset.meta.as_ref().map(|m| m.granularity.as_str()),
        lag_minutes = dataset.meta.as_ref().map(|m| m.lag_minutes),
        hash = %dataset.hash,
        "dataset loaded"
    );
    Ok(dataset)
}

/// A finished run and its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub result: BacktestResult,
    pub metrics: PerformanceMetrics,
}

/// Run one strategy over the dataset.
pub fn backtest(
    dataset: &Dataset,
    config: &StrategyConfig,
    settings: &RunSettings,
) -> Result<StrategyRun, RunError> {
    let result = run(&dataset.bars, config, settings)?;
    let metrics = PerformanceMetrics::compute(&result);
    tracing::info!(
        strategy = %config.kind,
        trades = metrics.trade_count,
        total_return = metrics.total_return,
        max_drawdown = metrics.max_drawdown,
        "backtest finished"
    );
    Ok(StrategyRun { result, metrics })
}

/// Several runs over one dataset, with their ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// In the order the configs were given.
    pub runs: Vec<StrategyRun>,
    pub rows: Vec<ComparisonRow>,
}

/// Run every config (in parallel) and rank the results by `objective`.
pub fn compare(
    dataset: &Dataset,
    configs: &[StrategyConfig],
    settings: &RunSettings,
    objective: FitnessMetric,
) -> Result<Comparison, RunError> {
    let runs = configs
        .par_iter()
        .map(|config| backtest(dataset, config, settings))
        .collect::<Result<Vec<_>, _>>()?;
    let rows = analyzer::rank(
        runs.iter()
            .map(|r| (r.result.config.kind, r.metrics.clone()))
            .collect(),
        objective,
    );
    Ok(Comparison { runs, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentilab_core::data::SyntheticSpec;
    use sentilab_core::{ConfigError, DataIntegrityError, SchemaError, StrategyKind};
    use sentilab_core::error::OhlcViolation;

    fn synthetic() -> Dataset {
        load_dataset(
            &DataSource::Synthetic(SyntheticSpec::new(500, 21)),
            &ColumnMapping::new(),
        )
        .unwrap()
    }

    #[test]
    fn synthetic_dataset_has_no_meta() {
        let dataset = synthetic();
        assert_eq!(dataset.bars.len(), 500);
        assert!(dataset.meta.is_none());
        assert_eq!(dataset.source, "synthetic(seed=21)");
    }

    #[test]
    fn backtest_is_deterministic() {
        let dataset = synthetic();
        let config = StrategyConfig::new(StrategyKind::Extreme).with_param("stop_loss", 0.02);
        let a = backtest(&dataset, &config, &RunSettings::default()).unwrap();
        let b = backtest(&dataset, &config, &RunSettings::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn compare_keeps_run_order_and_ranks_rows() {
        let dataset = synthetic();
        let configs: Vec<_> = StrategyKind::ALL
            .into_iter()
            .map(StrategyConfig::new)
            .collect();
        let comparison =
            compare(&dataset, &configs, &RunSettings::default(), FitnessMetric::TotalReturn)
                .unwrap();
        assert_eq!(comparison.runs.len(), 7);
        assert_eq!(comparison.runs[0].result.config.kind, StrategyKind::SignalLevel);
        let returns: Vec<f64> = comparison.rows.iter().map(|r| r.metrics.total_return).collect();
        assert!(returns.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn error_kinds_and_locations() {
        let missing: RunError = ReadError::Schema(SchemaError::MissingColumn {
            field: "volume",
            tried: vec!["volume".into()],
        })
        .into();
        assert_eq!(missing.kind(), "schema");
        assert_eq!(missing.location().as_deref(), Some("column `volume`"));

        let ohlc: RunError = BacktestError::from(DataIntegrityError {
            violations: vec![
                OhlcViolation { index: 3, reason: "high < low" },
                OhlcViolation { index: 7, reason: "high < close" },
            ],
        })
        .into();
        assert_eq!(ohlc.kind(), "data_integrity");
        assert_eq!(ohlc.location().as_deref(), Some("bar indices [3, 7]"));

        let config: RunError = BacktestError::from(ConfigError::EmptyBars).into();
        assert_eq!(config.kind(), "config");
        assert!(config.location().is_none());
    }
}
