//! Backtesting engine: the bar-by-bar simulation loop.
//!
//! One pass over the bars, in order. Per bar:
//!
//! 1. Decide: the strategy sees the bar and the position held going in
//! 2. Risk: the manager applies exit rules or entry gates (at most one transition)
//! 3. Flush: on the final bar any open position is closed at the close
//! 4. Mark: cash and equity at the close are appended to the curve
//!
//! No wall-clock or random input reaches the loop, so identical inputs give
//! identical results. The optional time budget only aborts a run.

pub mod costs;
pub mod integrity;
pub mod risk;

pub use costs::CostModel;
pub use integrity::check_ohlc;
pub use risk::{ExitFill, RiskConfig, RiskManager, Transition, VolumeGate, RISK_PARAMS};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::config::StrategyConfig;
use crate::domain::{BacktestResult, BarSeries, EquityPoint, TradeRecord};
use crate::error::{BacktestError, ConfigError, SimulationError};
use crate::strategy::{build_strategy, Strategy};

/// Bars between wall-clock checks when a time budget is set.
const BUDGET_CHECK_INTERVAL: usize = 256;

/// Run-level settings shared by every strategy in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub initial_cash: f64,
    #[serde(default)]
    pub costs: CostModel,
    /// Abort with `Timeout` once a single run exceeds this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_budget: Option<Duration>,
}

impl RunSettings {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            costs: CostModel::default(),
            time_budget: None,
        }
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::InvalidSettings(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        self.costs.validate()
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::new(100_000.0)
    }
}

/// Raw output of the loop before it is tied to a config.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

/// Build the strategy and risk rules for `config` and run them over `bars`.
pub fn run(
    bars: &BarSeries,
    config: &StrategyConfig,
    settings: &RunSettings,
) -> Result<BacktestResult, BacktestError> {
    let mut strategy = build_strategy(config)?;
    let risk = RiskConfig::from_config(config)?;
    let sim = simulate(bars, strategy.as_mut(), &risk, settings)?;
    Ok(BacktestResult::new(
        config.clone(),
        settings.initial_cash,
        sim.equity_curve,
        sim.trades,
    ))
}

/// Drive `strategy` through `bars` under `risk`.
///
/// Validates settings, non-emptiness and OHLC sanity before the first bar.
pub fn simulate(
    bars: &BarSeries,
    strategy: &mut dyn Strategy,
    risk: &RiskConfig,
    settings: &RunSettings,
) -> Result<Simulation, BacktestError> {
    settings.validate()?;
    risk.validate()?;
    if bars.is_empty() {
        return Err(ConfigError::EmptyBars.into());
    }
    check_ohlc(bars.as_slice())?;

    tracing::info!(
        strategy = strategy.name(),
        bars = bars.len(),
        warmup = strategy.warmup_bars(),
        "starting simulation"
    );

    let started = Instant::now();
    let last = bars.len() - 1;
    let mut manager = RiskManager::new(risk.clone(), settings.costs, settings.initial_cash);
    let mut equity_curve = Vec::with_capacity(bars.len());

    for (index, bar) in bars.iter().enumerate() {
        if let Some(budget) = settings.time_budget {
            if index % BUDGET_CHECK_INTERVAL == 0 && started.elapsed() >= budget {
                tracing::warn!(bars_processed = index, "time budget exceeded");
                return Err(BacktestError::Timeout {
                    budget_ms: budget.as_millis(),
                    bars_processed: index,
                });
            }
        }

        // ─── Decide ───
        let action = strategy.decide(index, bar, manager.position());

        // ─── Risk ───
        manager.on_bar(index, bar, action, index == last)?;

        // ─── Flush ───
        if index == last {
            manager.flush(index, bar)?;
        }

        // ─── Mark ───
        let equity = manager.equity(bar.close);
        if !equity.is_finite() {
            return Err(SimulationError::NonFiniteEquity {
                bar_index: index,
                equity,
            }
            .into());
        }
        equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            cash: manager.cash(),
            equity,
        });
    }

    let trades = manager.into_trades();
    tracing::info!(
        strategy = strategy.name(),
        trades = trades.len(),
        final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(settings.initial_cash),
        "simulation finished"
    );
    Ok(Simulation {
        equity_curve,
        trades,
    })
}
