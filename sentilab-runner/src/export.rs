//! Reporting and export: JSON, CSV, SVG and Markdown artifacts.
//!
//! Layout under the output directory:
//! - `<strategy>/`: `params.json`, `metrics.json`, `result.json`,
//!   `trades.csv`, `equity.csv`, `equity.svg`, `report.md`
//! - `comparison.csv` for compare mode
//! - `optimization_<strategy>.csv` and `best_params.json` for optimize mode
//!
//! Persisted results carry a `schema_version`; newer versions are rejected
//! on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sentilab_core::config::ExitRule;
use sentilab_core::data::DatasetMeta;
use sentilab_core::domain::{EquityPoint, TradingMode, SCHEMA_VERSION};
use sentilab_core::{BacktestResult, StrategyKind, TradeRecord};

use crate::analyzer::ComparisonRow;
use crate::fitness::FitnessMetric;
use crate::metrics::PerformanceMetrics;
use crate::optimizer::{OptimizationReport, RowOutcome};
use crate::runner::{Dataset, StrategyRun};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

/// Contents of `params.json`: enough to reproduce the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamsFile {
    pub schema_version: u32,
    pub strategy: StrategyKind,
    pub trading_mode: TradingMode,
    pub exit_order: Vec<ExitRule>,
    pub params: BTreeMap<String, f64>,
    pub config_hash: String,
    pub initial_cash: f64,
    pub data_source: String,
    pub dataset_hash: String,
    pub dataset: Option<DatasetMeta>,
}

impl ParamsFile {
    pub fn new(result: &BacktestResult, dataset: &Dataset) -> Self {
        let config = &result.config;
        Self {
            schema_version: SCHEMA_VERSION,
            strategy: config.kind,
            trading_mode: config.trading_mode,
            exit_order: config.exit_order.clone(),
            params: config.params.clone(),
            config_hash: config.full_hash().to_string(),
            initial_cash: result.initial_cash,
            data_source: dataset.source.clone(),
            dataset_hash: dataset.hash.to_string(),
            dataset: dataset.meta.clone(),
        }
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export a trade list as CSV.
///
/// Columns: direction, entry_index, entry_time, entry_price, exit_index,
/// exit_time, exit_price, size, gross_pnl, costs, pnl, return_pct,
/// bars_held, exit_reason
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "direction",
        "entry_index",
        "entry_time",
        "entry_price",
        "exit_index",
        "exit_time",
        "exit_price",
        "size",
        "gross_pnl",
        "costs",
        "pnl",
        "return_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.direction.to_string(),
            t.entry_index.to_string(),
            t.entry_time.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_index.to_string(),
            t.exit_time.to_string(),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.size),
            format!("{:.2}", t.gross_pnl),
            format!("{:.2}", t.costs),
            format!("{:.2}", t.pnl),
            format!("{:.6}", t.return_pct()),
            t.bars_held().to_string(),
            t.exit_reason.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV with bar_index, timestamp, cash and equity.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "cash", "equity"])?;
    for (i, p) in equity_curve.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            p.timestamp.to_string(),
            format!("{:.2}", p.cash),
            format!("{:.2}", p.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Ranked strategy comparison.
pub fn export_comparison_csv(rows: &[ComparisonRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["rank", "strategy"];
    header.extend(METRIC_COLUMNS);
    wtr.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.rank.to_string(), row.strategy.to_string()];
        record.extend(metric_cells(&row.metrics));
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Ranked grid-search rows: one column per grid parameter, then metrics.
/// Failed rows leave metric cells empty and carry the error kind.
pub fn export_optimization_csv(report: &OptimizationReport) -> Result<String> {
    let param_names: Vec<&str> = report
        .rows
        .first()
        .map(|r| r.params.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["rank", "combination", "config_hash", "status"];
    header.extend(&param_names);
    header.extend(METRIC_COLUMNS);
    header.push("error");
    wtr.write_record(&header)?;

    for row in &report.rows {
        let mut record = vec![
            row.rank.to_string(),
            row.combination.to_string(),
            row.config_hash.clone(),
        ];
        match &row.outcome {
            RowOutcome::Completed(_) => record.push("completed".into()),
            RowOutcome::Failed { kind, .. } => record.push(format!("failed:{kind}")),
        }
        record.extend(
            param_names
                .iter()
                .map(|name| row.params.get(*name).map(f64::to_string).unwrap_or_default()),
        );
        match &row.outcome {
            RowOutcome::Completed(metrics) => {
                record.extend(metric_cells(metrics));
                record.push(String::new());
            }
            RowOutcome::Failed { message, .. } => {
                record.extend(METRIC_COLUMNS.iter().map(|_| String::new()));
                record.push(message.clone());
            }
        }
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

const METRIC_COLUMNS: [&str; 10] = [
    "total_return",
    "annualized_return",
    "max_drawdown",
    "sharpe",
    "sortino",
    "win_rate",
    "profit_factor",
    "trade_count",
    "avg_bars_held",
    "final_equity",
];

fn metric_cells(m: &PerformanceMetrics) -> Vec<String> {
    vec![
        format!("{:.6}", m.total_return),
        format!("{:.6}", m.annualized_return),
        format!("{:.6}", m.max_drawdown),
        format!("{:.4}", m.sharpe),
        format!("{:.4}", m.sortino),
        format!("{:.4}", m.win_rate),
        format!("{:.4}", m.profit_factor),
        m.trade_count.to_string(),
        format!("{:.2}", m.avg_bars_held),
        format!("{:.2}", m.final_equity),
    ]
}

// ─── Chart ──────────────────────────────────────────────────────────

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 300.0;
const CHART_PAD: f64 = 30.0;

/// Equity curve as a standalone SVG line chart, with a dashed line at the
/// starting cash.
pub fn equity_chart_svg(result: &BacktestResult) -> String {
    let values = result.equity_values();
    let (lo, hi) = values
        .iter()
        .fold((result.initial_cash, result.initial_cash), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = if hi - lo > f64::EPSILON { hi - lo } else { 1.0 };
    let step = if values.len() > 1 {
        (CHART_WIDTH - 2.0 * CHART_PAD) / (values.len() - 1) as f64
    } else {
        0.0
    };
    let y = |v: f64| CHART_HEIGHT - CHART_PAD - (v - lo) / span * (CHART_HEIGHT - 2.0 * CHART_PAD);

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.1},{:.1}", CHART_PAD + i as f64 * step, y(v)))
        .collect();

    let mut svg = String::with_capacity(points.len() * 12 + 512);
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{CHART_WIDTH}\" height=\"{CHART_HEIGHT}\" viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\">\n"
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "<text x=\"{CHART_PAD}\" y=\"20\" font-family=\"monospace\" font-size=\"12\">{} equity ({:.2} → {:.2})</text>\n",
        result.config.kind,
        result.initial_cash,
        result.final_equity()
    ));
    let base = y(result.initial_cash);
    svg.push_str(&format!(
        "<line x1=\"{CHART_PAD}\" y1=\"{base:.1}\" x2=\"{:.1}\" y2=\"{base:.1}\" stroke=\"gray\" stroke-dasharray=\"4 4\"/>\n",
        CHART_WIDTH - CHART_PAD
    ));
    svg.push_str(&format!(
        "<polyline fill=\"none\" stroke=\"steelblue\" stroke-width=\"1.5\" points=\"{}\"/>\n",
        points.join(" ")
    ));
    svg.push_str("</svg>\n");
    svg
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable summary of one run.
pub fn generate_report(run: &StrategyRun, dataset: &Dataset) -> String {
    let m = &run.metrics;
    let config = &run.result.config;
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# Backtest Report: {}\n\n", config.kind));

    md.push_str("## Data\n\n| Field | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Source | {} |\n", dataset.source));
    md.push_str(&format!("| Bars | {} ({} dropped) |\n", dataset.bars.len(), dataset.dropped_rows));
    if let Some(meta) = &dataset.meta {
        md.push_str(&format!(
            "| Instrument | {} |\n| Granularity | {} |\n| Signal lag | {} min |\n",
            meta.instrument.as_deref().unwrap_or("-"),
            meta.granularity,
            meta.lag_minutes
        ));
    }
    md.push_str(&format!("| Dataset hash | {} |\n\n", dataset.hash));

    md.push_str("## Parameters\n\n| Name | Value |\n| --- | --- |\n");
    md.push_str(&format!("| trading_mode | {:?} |\n", config.trading_mode));
    for (name, value) in &config.params {
        md.push_str(&format!("| {name} | {value} |\n"));
    }
    md.push('\n');

    md.push_str("## Performance\n\n| Metric | Value |\n| --- | --- |\n");
    md.push_str(&format!("| Total return | {:.2}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Annualized return | {:.2}% |\n", m.annualized_return * 100.0));
    md.push_str(&format!("| Max drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino));
    md.push_str(&format!("| Win rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Avg bars held | {:.1} |\n", m.avg_bars_held));
    md.push_str(&format!("| Final equity | {:.2} |\n\n", m.final_equity));

    md.push_str("## Exit reasons\n\n| Reason | Trades |\n| --- | --- |\n");
    for (reason, count) in &m.exit_reasons {
        md.push_str(&format!("| {reason} | {count} |\n"));
    }
    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one strategy run under
/// `output_dir/<strategy>/`. Returns that directory.
pub fn save_artifacts(run: &StrategyRun, dataset: &Dataset, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(run.result.config.kind.as_str());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let params = ParamsFile::new(&run.result, dataset);
    write(&run_dir, "params.json", &to_json(&params)?)?;
    write(&run_dir, "metrics.json", &to_json(&run.metrics)?)?;
    write(&run_dir, "result.json", &export_json(&run.result)?)?;
    write(&run_dir, "trades.csv", &export_trades_csv(&run.result.trades)?)?;
    write(&run_dir, "equity.csv", &export_equity_csv(&run.result.equity_curve)?)?;
    write(&run_dir, "equity.svg", &equity_chart_svg(&run.result))?;
    write(&run_dir, "report.md", &generate_report(run, dataset))?;

    tracing::info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Write `comparison.csv`; returns its path.
pub fn save_comparison(rows: &[ComparisonRow], output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    write(output_dir, "comparison.csv", &export_comparison_csv(rows)?)
}

/// Contents of `best_params.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestParams {
    pub strategy: StrategyKind,
    pub objective: FitnessMetric,
    pub score: f64,
    pub params: BTreeMap<String, f64>,
    pub config_hash: String,
    pub metrics: PerformanceMetrics,
}

/// Write `optimization_<strategy>.csv` and, when any row completed,
/// `best_params.json`. Returns the CSV path.
pub fn save_optimization(report: &OptimizationReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let csv_path = write(
        output_dir,
        &format!("optimization_{}.csv", report.strategy),
        &export_optimization_csv(report)?,
    )?;

    if let Some((row, metrics)) = report.best().and_then(|r| r.metrics().map(|m| (r, m))) {
        let best = BestParams {
            strategy: report.strategy,
            objective: report.objective,
            score: report.objective.extract(metrics),
            params: row.params.clone(),
            config_hash: row.config_hash.clone(),
            metrics: metrics.clone(),
        };
        write(output_dir, "best_params.json", &to_json(&best)?)?;
    }
    Ok(csv_path)
}

// ── Helpers ──

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize to JSON")
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
