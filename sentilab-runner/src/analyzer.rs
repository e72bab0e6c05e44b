//! Strategy comparison: ranked table over several completed runs.
//!
//! Ordering: objective descending, then max drawdown descending (a shallower
//! drawdown is less negative), then input order. The same comparator ranks
//! optimizer rows.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sentilab_core::{BacktestResult, StrategyKind};

use crate::fitness::FitnessMetric;
use crate::metrics::PerformanceMetrics;

/// One line of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// 1-based position after sorting.
    pub rank: usize,
    pub strategy: StrategyKind,
    pub metrics: PerformanceMetrics,
}

/// Compare two metric sets; `Less` means `a` ranks ahead of `b`.
pub fn rank_order(
    objective: FitnessMetric,
    a: &PerformanceMetrics,
    b: &PerformanceMetrics,
) -> Ordering {
    let (oa, ob) = (objective.extract(a), objective.extract(b));
    ob.total_cmp(&oa)
        .then_with(|| b.max_drawdown.total_cmp(&a.max_drawdown))
}

/// Compute metrics for each result and rank them by `objective`.
pub fn compare(results: &[BacktestResult], objective: FitnessMetric) -> Vec<ComparisonRow> {
    let rows = results
        .iter()
        .map(|r| (r.config.kind, PerformanceMetrics::compute(r)))
        .collect();
    rank(rows, objective)
}

/// Rank precomputed metrics. The sort is stable, so full ties keep input order.
pub fn rank(
    mut rows: Vec<(StrategyKind, PerformanceMetrics)>,
    objective: FitnessMetric,
) -> Vec<ComparisonRow> {
    rows.sort_by(|(_, a), (_, b)| rank_order(objective, a, b));
    rows.into_iter()
        .enumerate()
        .map(|(i, (strategy, metrics))| ComparisonRow {
            rank: i + 1,
            strategy,
            metrics,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn metrics(total_return: f64, max_drawdown: f64) -> PerformanceMetrics {
        PerformanceMetrics {
            total_return,
            annualized_return: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
            max_drawdown,
            win_rate: 0.0,
            profit_factor: 0.0,
            trade_count: 0,
            final_equity: 0.0,
            avg_trade_return: 0.0,
            avg_bars_held: 0.0,
            periods_per_year: 252.0,
            exit_reasons: BTreeMap::new(),
        }
    }

    #[test]
    fn ranks_by_total_return_descending() {
        let rows = rank(
            vec![
                (StrategyKind::Momentum, metrics(0.01, -0.1)),
                (StrategyKind::Extreme, metrics(0.05, -0.1)),
                (StrategyKind::TurtleTrading, metrics(-0.02, -0.1)),
            ],
            FitnessMetric::TotalReturn,
        );
        let order: Vec<_> = rows.iter().map(|r| r.strategy).collect();
        assert_eq!(
            order,
            vec![StrategyKind::Extreme, StrategyKind::Momentum, StrategyKind::TurtleTrading]
        );
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn ties_break_on_shallower_drawdown() {
        let rows = rank(
            vec![
                (StrategyKind::Layered, metrics(0.03, -0.20)),
                (StrategyKind::BollingerBands, metrics(0.03, -0.05)),
            ],
            FitnessMetric::TotalReturn,
        );
        assert_eq!(rows[0].strategy, StrategyKind::BollingerBands);
    }

    #[test]
    fn full_tie_keeps_input_order() {
        let rows = rank(
            vec![
                (StrategyKind::TurtleTrading, metrics(0.0, 0.0)),
                (StrategyKind::SignalLevel, metrics(0.0, 0.0)),
            ],
            FitnessMetric::TotalReturn,
        );
        assert_eq!(rows[0].strategy, StrategyKind::TurtleTrading);
    }
}
