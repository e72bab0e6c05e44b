//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function of a `BacktestResult` (or a slice of it):
//! computing twice gives identical numbers. Ratios use population standard
//! deviation and are annualized with the bar frequency inferred from the
//! median timestamp delta.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sentilab_core::domain::{BacktestResult, ExitReason, TradeRecord};

/// Used when the series is too short to infer a frequency.
pub const FALLBACK_PERIODS_PER_YEAR: f64 = 252.0;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Negative fraction, e.g. -0.15 for a 15% peak-to-trough loss.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub final_equity: f64,
    pub avg_trade_return: f64,
    pub avg_bars_held: f64,
    pub periods_per_year: f64,
    /// Trade count per exit reason; every reason is present.
    pub exit_reasons: BTreeMap<String, usize>,
}

impl PerformanceMetrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let equity = equity_with_start(result);
        let returns = bar_returns(&equity);
        let ppy = periods_per_year(&result.timestamps());
        let tr = total_return(&equity);
        Self {
            total_return: tr,
            annualized_return: annualized_return(tr, returns.len(), ppy),
            sharpe: sharpe_ratio(&returns, ppy),
            sortino: sortino_ratio(&returns, ppy),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(&result.trades),
            profit_factor: profit_factor(&result.trades),
            trade_count: result.trades.len(),
            final_equity: result.final_equity(),
            avg_trade_return: avg_trade_return(&result.trades),
            avg_bars_held: avg_bars_held(&result.trades),
            periods_per_year: ppy,
            exit_reasons: exit_reason_counts(&result.trades),
        }
    }
}

/// Initial cash followed by the per-bar equity.
fn equity_with_start(result: &BacktestResult) -> Vec<f64> {
    std::iter::once(result.initial_cash)
        .chain(result.equity_curve.iter().map(|p| p.equity))
        .collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&initial), Some(&last)) if initial > 0.0 => (last - initial) / initial,
        _ => 0.0,
    }
}

/// Simple per-bar returns; a non-positive base yields 0 for that bar.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Bars per year from the median positive gap between timestamps.
pub fn periods_per_year(timestamps: &[NaiveDateTime]) -> f64 {
    let mut gaps: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds() as f64 / 1000.0)
        .filter(|s| *s > 0.0)
        .collect();
    if gaps.is_empty() {
        return FALLBACK_PERIODS_PER_YEAR;
    }
    gaps.sort_by(f64::total_cmp);
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) / 2.0
    } else {
        gaps[mid]
    };
    SECONDS_PER_YEAR / median
}

/// `(1 + total_return)^(ppy / bars) - 1`; -1 once the account is wiped out.
pub fn annualized_return(total_return: f64, bars: usize, periods_per_year: f64) -> f64 {
    if bars == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / bars as f64) - 1.0
}

/// mean / std of bar returns, scaled by sqrt(periods per year).
///
/// Returns 0.0 for fewer than 2 returns or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * periods_per_year.sqrt()
}

/// Like Sharpe but divides by downside deviation only.
pub fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * periods_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity never falls below a previous peak.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive net PnL; 0 without trades.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when nothing was lost.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn avg_trade_return(trades: &[TradeRecord]) -> f64 {
    let returns: Vec<f64> = trades.iter().map(TradeRecord::return_pct).collect();
    mean_f64(&returns)
}

pub fn avg_bars_held(trades: &[TradeRecord]) -> f64 {
    let held: Vec<f64> = trades.iter().map(|t| t.bars_held() as f64).collect();
    mean_f64(&held)
}

pub fn exit_reason_counts(trades: &[TradeRecord]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = ExitReason::ALL
        .iter()
        .map(|r| (r.as_str().to_string(), 0))
        .collect();
    for trade in trades {
        *counts.entry(trade.exit_reason.as_str().to_string()).or_default() += 1;
    }
    counts
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
