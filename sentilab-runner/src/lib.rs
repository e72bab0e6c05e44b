//! SentiLab Runner: backtest orchestration, metrics, comparison, grid search.
//!
//! This crate builds on `sentilab-core` to provide:
//! - TOML run configuration with CLI-overridable sections
//! - Dataset loading (CSV/Parquet or synthetic) with filename metadata
//! - Single-backtest and multi-strategy comparison runners
//! - Performance metrics and objective-based ranking
//! - Lazy Cartesian grid search on the rayon pool
//! - Strategy catalog (defaults and default grids)
//! - JSON/CSV/SVG/Markdown artifacts

pub mod analyzer;
pub mod catalog;
pub mod config;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod optimizer;
pub mod runner;

pub use analyzer::{compare as compare_results, rank, ComparisonRow};
pub use catalog::{catalog, profile, StrategyProfile};
pub use config::{DataSource, RunConfig, StrategySelection};
pub use fitness::FitnessMetric;
pub use metrics::PerformanceMetrics;
pub use optimizer::{
    CancelToken, GridError, OptimizationReport, OptimizationRow, OptimizeError, Optimizer,
    ParamGrid, RowOutcome,
};
pub use runner::{backtest, compare, load_dataset, Comparison, Dataset, RunError, StrategyRun};
