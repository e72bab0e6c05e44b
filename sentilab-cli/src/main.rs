//! SentiLab CLI: backtest, optimize and compare sentiment strategies.
//!
//! Modes:
//! - `backtest`: run the selected strategy (or `all`) and write artifacts
//! - `optimize`: grid-search the selected strategy's parameters
//! - `compare`: run every selected strategy and rank them
//!
//! `--info` prints the strategy catalog and exits. A TOML config (`--config`)
//! supplies defaults; flags override it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentilab_runner::config::SyntheticSection;
use sentilab_runner::export::{save_artifacts, save_comparison, save_optimization};
use sentilab_runner::{
    backtest, catalog, compare, load_dataset, Dataset, FitnessMetric, OptimizationReport,
    Optimizer, PerformanceMetrics, RowOutcome, RunConfig, RunError,
};

#[derive(Parser)]
#[command(
    name = "sentilab",
    about = "SentiLab CLI: sentiment-driven strategy backtesting"
)]
struct Cli {
    /// Strategy name, or `all`.
    #[arg(long)]
    strategy: Option<String>,

    /// Input table (.csv or .parquet).
    #[arg(long = "data_path", alias = "data-path")]
    data_path: Option<PathBuf>,

    /// Directory for result artifacts.
    #[arg(long = "output_dir", alias = "output-dir")]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Backtest)]
    mode: Mode,

    /// Print the strategy catalog and exit.
    #[arg(long, default_value_t = false)]
    info: bool,

    /// TOML run configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use a seeded synthetic series of this many bars instead of a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for `--synthetic`.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Ranking objective (total_return, sharpe, max_drawdown, ...).
    #[arg(long)]
    objective: Option<FitnessMetric>,

    /// Run grid combinations one at a time.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Backtest,
    Optimize,
    Compare,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Print the error kind and location instead of a backtrace.
fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<RunError>() {
        Some(run_err) => {
            eprintln!("error [{}]: {run_err}", run_err.kind());
            if let Some(location) = run_err.location() {
                eprintln!("  at {location}");
            }
        }
        None => {
            eprintln!("error: {err}");
            for cause in err.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.info {
        print_catalog();
        return Ok(());
    }

    let config = build_config(&cli)?;
    let dataset = load_dataset(
        &config.data_source().map_err(to_run_error)?,
        &config.column_mapping().map_err(to_run_error)?,
    )?;
    print_dataset(&dataset);

    match cli.mode {
        Mode::Backtest => run_backtest(&config, &dataset),
        Mode::Optimize => run_optimize(&config, &dataset),
        Mode::Compare => run_compare(&config, &dataset),
    }
}

/// File config (if any) with command-line overrides applied.
fn build_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(strategy) = &cli.strategy {
        config.strategy.name = strategy.clone();
    }
    if let Some(path) = &cli.data_path {
        config.data.path = Some(path.clone());
        config.data.synthetic = None;
    }
    if let Some(bars) = cli.synthetic {
        config.data.synthetic = Some(SyntheticSection {
            bars,
            seed: cli.seed,
        });
    }
    if let Some(dir) = &cli.output_dir {
        config.backtest.output_dir = dir.clone();
    }
    if let Some(objective) = cli.objective {
        config.optimize.objective = objective;
    }
    if cli.sequential {
        config.optimize.parallel = false;
    }
    config.selection().map_err(to_run_error)?;
    Ok(config)
}

fn to_run_error(err: sentilab_core::ConfigError) -> RunError {
    RunError::Backtest(err.into())
}

fn run_backtest(config: &RunConfig, dataset: &Dataset) -> Result<()> {
    let settings = config.run_settings();
    for kind in config.selection().map_err(to_run_error)?.kinds() {
        let strategy = config.strategy_config(kind).map_err(to_run_error)?;
        let run = backtest(dataset, &strategy, &settings)?;
        print_summary(&kind.to_string(), &run.metrics);
        let dir = save_artifacts(&run, dataset, &config.backtest.output_dir)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn run_compare(config: &RunConfig, dataset: &Dataset) -> Result<()> {
    let kinds = config.selection().map_err(to_run_error)?.kinds();
    let strategies = kinds
        .iter()
        .map(|kind| config.strategy_config(*kind))
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_run_error)?;
    let comparison = compare(
        dataset,
        &strategies,
        &config.run_settings(),
        config.optimize.objective,
    )?;

    for run in &comparison.runs {
        save_artifacts(run, dataset, &config.backtest.output_dir)?;
    }
    let path = save_comparison(&comparison.rows, &config.backtest.output_dir)?;

    println!();
    println!("=== Strategy Comparison (by {}) ===", config.optimize.objective);
    println!(
        "{:<4} {:<22} {:>10} {:>10} {:>8} {:>7} {:>8}",
        "#", "strategy", "return", "max_dd", "win", "trades", "sharpe"
    );
    for row in &comparison.rows {
        let m = &row.metrics;
        println!(
            "{:<4} {:<22} {:>9.2}% {:>9.2}% {:>7.1}% {:>7} {:>8.3}",
            row.rank,
            row.strategy,
            m.total_return * 100.0,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.trade_count,
            m.sharpe
        );
    }
    println!("Comparison saved to: {}", path.display());
    Ok(())
}

fn run_optimize(config: &RunConfig, dataset: &Dataset) -> Result<()> {
    let optimizer = Optimizer::new(config.run_settings())
        .with_objective(config.optimize.objective)
        .with_parallelism(config.optimize.parallel);

    for kind in config.selection().map_err(to_run_error)?.kinds() {
        let base = config.strategy_config(kind).map_err(to_run_error)?;
        let grid = config.grid(kind);
        let step = (grid.size() / 10).max(1);
        let report = optimizer
            .optimize_with_progress(&dataset.bars, &base, &grid, |done, total| {
                if done % step == 0 || done == total {
                    tracing::info!(strategy = %kind, done, total, "grid search progress");
                }
            })
            .map_err(RunError::from)?;
        print_optimization(&report);
        let path = save_optimization(&report, &config.backtest.output_dir)?;
        println!("Optimization table saved to: {}", path.display());
    }
    Ok(())
}

// ─── Printing ───────────────────────────────────────────────────────

fn print_catalog() {
    println!("=== Strategy Catalog ===");
    for profile in catalog() {
        println!();
        println!("{}", profile.kind);
        println!("  {}", profile.description);
        println!("  parameters: {}", profile.params().join(", "));
        let defaults: Vec<String> = profile
            .defaults
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("  defaults:   {}", defaults.join(", "));
        let grid: Vec<String> = profile
            .grid
            .iter()
            .map(|(name, values)| format!("{name}={values:?}"))
            .collect();
        println!(
            "  grid ({} combinations): {}",
            profile.default_grid().size(),
            grid.join(", ")
        );
    }
    println!();
    println!(
        "Risk parameters (every strategy): {}",
        sentilab_core::engine::RISK_PARAMS.join(", ")
    );
}

fn print_dataset(dataset: &Dataset) {
    println!("Data:           {}", dataset.source);
    println!(
        "Bars:           {} ({} dropped)",
        dataset.bars.len(),
        dataset.dropped_rows
    );
    if let (Some(first), Some(last)) =
        (dataset.bars.first_timestamp(), dataset.bars.last_timestamp())
    {
        println!("Period:         {first} to {last}");
    }
    if let Some(meta) = &dataset.meta {
        println!(
            "Granularity:    {} (signal lag {} min)",
            meta.granularity, meta.lag_minutes
        );
    }
}

fn print_summary(strategy: &str, m: &PerformanceMetrics) {
    println!();
    println!("=== Backtest Result: {strategy} ===");
    println!("Trades:         {}", m.trade_count);
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Final Equity:   {:.2}", m.final_equity);
}

fn print_optimization(report: &OptimizationReport) {
    println!();
    println!(
        "=== Optimization: {} ({} of {} combinations, by {}) ===",
        report.strategy,
        report.rows.len(),
        report.total_combinations,
        report.objective
    );
    for row in report.rows.iter().take(10) {
        let params: Vec<String> = row.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        match &row.outcome {
            RowOutcome::Completed(m) => println!(
                "{:>4}  return {:>8.2}%  dd {:>8.2}%  trades {:>5}  {}",
                row.rank,
                m.total_return * 100.0,
                m.max_drawdown * 100.0,
                m.trade_count,
                params.join(" ")
            ),
            RowOutcome::Failed { kind, .. } => {
                println!("{:>4}  failed [{kind}]  {}", row.rank, params.join(" "))
            }
        }
    }
    let failed = report.failed().count();
    if failed > 0 {
        println!("{failed} combination(s) failed");
    }
    match report.best() {
        Some(best) => println!("Best: {:?}", best.params),
        None => println!("No combination completed"),
    }
}
