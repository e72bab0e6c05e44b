//! BacktestResult: the immutable product of one run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::trade::TradeRecord;
use crate::config::StrategyConfig;

/// Current schema version for persisted results. Bump when fields change.
pub const SCHEMA_VERSION: u32 = 1;

/// Cash and mark-to-market equity at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cash: f64,
    pub equity: f64,
}

/// Equity curve plus trade log, tagged with the config that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    pub config: StrategyConfig,
    pub initial_cash: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestResult {
    pub fn new(
        config: StrategyConfig,
        initial_cash: f64,
        equity_curve: Vec<EquityPoint>,
        trades: Vec<TradeRecord>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            config,
            initial_cash,
            equity_curve,
            trades,
        }
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }

    /// Equity values only, in bar order.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.equity_curve.iter().map(|p| p.timestamp).collect()
    }
}
