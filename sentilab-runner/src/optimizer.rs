//! Grid-search optimizer: one backtest per point of a parameter grid.
//!
//! - The Cartesian product is generated lazily, so large grids are never
//!   materialized up front.
//! - Combinations run on the rayon pool (or sequentially) and share only the
//!   read-only bar series.
//! - A rejected config or a blown time budget becomes a failed row; data
//!   and internal errors abort the whole search.
//! - A [`CancelToken`] stops the search between combinations; finished rows
//!   are kept and the report is marked interrupted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sentilab_core::engine::{check_ohlc, run, RunSettings};
use sentilab_core::{BacktestError, BarSeries, ConfigError, StrategyConfig, StrategyKind};

use crate::analyzer::rank_order;
use crate::fitness::FitnessMetric;
use crate::metrics::PerformanceMetrics;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("grid axis `{name}` has no candidate values")]
    EmptyAxis { name: String },

    #[error("grid axis `{name}` contains non-finite value {value}")]
    NonFinite { name: String, value: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),
}

// ─── Parameter grid ─────────────────────────────────────────────────

/// Candidate values per parameter name.
///
/// Values are kept sorted and deduplicated, so no two combinations carry the
/// same parameter tuple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    axes: BTreeMap<String, Vec<f64>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_axis(mut self, name: &str, values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values.into_iter().collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        self.axes.insert(name.to_string(), values);
        self
    }

    pub fn from_axes(axes: BTreeMap<String, Vec<f64>>) -> Self {
        axes.into_iter()
            .fold(Self::new(), |grid, (name, values)| grid.with_axis(&name, values))
    }

    pub fn axes(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.axes
    }

    pub fn validate(&self) -> Result<(), GridError> {
        for (name, values) in &self.axes {
            if values.is_empty() {
                return Err(GridError::EmptyAxis { name: name.clone() });
            }
            if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
                return Err(GridError::NonFinite {
                    name: name.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Number of combinations (1 for an empty grid: the base config alone).
    pub fn size(&self) -> usize {
        self.axes.values().map(Vec::len).product()
    }

    pub fn combinations(&self) -> Combinations<'_> {
        Combinations {
            axes: self.axes.iter().collect(),
            cursor: vec![0; self.axes.len()],
            done: self.axes.values().any(Vec::is_empty),
        }
    }
}

/// Lazy odometer over a [`ParamGrid`]; the last axis (by name) varies fastest.
pub struct Combinations<'a> {
    axes: Vec<(&'a String, &'a Vec<f64>)>,
    cursor: Vec<usize>,
    done: bool,
}

impl Iterator for Combinations<'_> {
    type Item = BTreeMap<String, f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self
            .axes
            .iter()
            .zip(&self.cursor)
            .map(|((name, values), &i)| ((*name).clone(), values[i]))
            .collect();

        // Advance, carrying leftwards.
        self.done = true;
        for pos in (0..self.cursor.len()).rev() {
            self.cursor[pos] += 1;
            if self.cursor[pos] < self.axes[pos].1.len() {
                self.done = false;
                break;
            }
            self.cursor[pos] = 0;
        }
        Some(item)
    }
}

// ─── Cancellation ───────────────────────────────────────────────────

/// Shared flag checked before each combination starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ─── Report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Completed(PerformanceMetrics),
    Failed { kind: String, message: String },
}

/// One grid point and what became of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRow {
    /// 1-based; completed rows first.
    pub rank: usize,
    /// Position in the enumeration order of the grid.
    pub combination: usize,
    pub params: BTreeMap<String, f64>,
    pub config_hash: String,
    pub outcome: RowOutcome,
}

impl OptimizationRow {
    pub fn metrics(&self) -> Option<&PerformanceMetrics> {
        match &self.outcome {
            RowOutcome::Completed(m) => Some(m),
            RowOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RowOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub strategy: StrategyKind,
    pub objective: FitnessMetric,
    pub rows: Vec<OptimizationRow>,
    pub total_combinations: usize,
    /// Cancelled before every combination ran.
    pub interrupted: bool,
}

impl OptimizationReport {
    /// Top completed row by the objective.
    pub fn best(&self) -> Option<&OptimizationRow> {
        self.rows.first().filter(|r| !r.is_failed())
    }

    pub fn completed(&self) -> impl Iterator<Item = &OptimizationRow> {
        self.rows.iter().filter(|r| !r.is_failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &OptimizationRow> {
        self.rows.iter().filter(|r| r.is_failed())
    }
}

// ─── Optimizer ──────────────────────────────────────────────────────

pub struct Optimizer {
    objective: FitnessMetric,
    parallel: bool,
    settings: RunSettings,
    cancel: CancelToken,
}

impl Optimizer {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            objective: FitnessMetric::default(),
            parallel: true,
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_objective(mut self, objective: FitnessMetric) -> Self {
        self.objective = objective;
        self
    }

    /// Enable or disable parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn optimize(
        &self,
        bars: &BarSeries,
        base: &StrategyConfig,
        grid: &ParamGrid,
    ) -> Result<OptimizationReport, OptimizeError> {
        self.optimize_with_progress(bars, base, grid, |_, _| {})
    }

    /// Like [`optimize`](Self::optimize), calling `progress(done, total)`
    /// after each finished combination.
    pub fn optimize_with_progress<F>(
        &self,
        bars: &BarSeries,
        base: &StrategyConfig,
        grid: &ParamGrid,
        progress: F,
    ) -> Result<OptimizationReport, OptimizeError>
    where
        F: Fn(usize, usize) + Sync,
    {
        grid.validate()?;
        self.settings.validate().map_err(BacktestError::from)?;
        if bars.is_empty() {
            return Err(BacktestError::from(ConfigError::EmptyBars).into());
        }
        check_ohlc(bars.as_slice()).map_err(BacktestError::from)?;

        let total = grid.size();
        tracing::info!(
            strategy = %base.kind,
            combinations = total,
            objective = %self.objective,
            parallel = self.parallel,
            "starting grid search"
        );

        let finished = AtomicUsize::new(0);
        let evaluate = |(combination, params): (usize, BTreeMap<String, f64>)|
         -> Result<Option<OptimizationRow>, BacktestError> {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }
            let row = self.evaluate(bars, base, combination, params)?;
            let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            Ok(Some(row))
        };

        let outcomes: Result<Vec<Option<OptimizationRow>>, BacktestError> = if self.parallel {
            grid.combinations().enumerate().par_bridge().map(evaluate).collect()
        } else {
            grid.combinations().enumerate().map(evaluate).collect()
        };
        let mut rows: Vec<OptimizationRow> = outcomes?.into_iter().flatten().collect();

        let interrupted = rows.len() < total;
        self.rank_rows(&mut rows);

        let report = OptimizationReport {
            strategy: base.kind,
            objective: self.objective,
            rows,
            total_combinations: total,
            interrupted,
        };
        tracing::info!(
            completed = report.completed().count(),
            failed = report.failed().count(),
            interrupted,
            "grid search finished"
        );
        Ok(report)
    }

    fn evaluate(
        &self,
        bars: &BarSeries,
        base: &StrategyConfig,
        combination: usize,
        params: BTreeMap<String, f64>,
    ) -> Result<OptimizationRow, BacktestError> {
        let config = base.overridden(&params);
        let config_hash = config.full_hash().short().to_string();
        let outcome = match run(bars, &config, &self.settings) {
            Ok(result) => RowOutcome::Completed(PerformanceMetrics::compute(&result)),
            Err(err @ (BacktestError::Config(_) | BacktestError::Timeout { .. })) => {
                tracing::warn!(combination, ?params, kind = err.kind(), error = %err, "combination failed");
                RowOutcome::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
            Err(err) => return Err(err),
        };
        Ok(OptimizationRow {
            rank: 0,
            combination,
            params,
            config_hash,
            outcome,
        })
    }

    fn rank_rows(&self, rows: &mut [OptimizationRow]) {
        rows.sort_by(|a, b| match (a.metrics(), b.metrics()) {
            (Some(ma), Some(mb)) => rank_order(self.objective, ma, mb)
                .then_with(|| a.combination.cmp(&b.combination)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.combination.cmp(&b.combination),
        });
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }
    }
}
