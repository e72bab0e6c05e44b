//! Grid-search scenarios over a fixed synthetic series.

use std::collections::HashSet;

use proptest::prelude::*;
use sentilab_core::data::{synthetic_bars, SyntheticSpec};
use sentilab_core::engine::RunSettings;
use sentilab_core::{BarSeries, StrategyConfig, StrategyKind};
use sentilab_runner::optimizer::{Optimizer, ParamGrid};
use sentilab_runner::FitnessMetric;

// ── Helpers ──────────────────────────────────────────────────────────

fn bars() -> BarSeries {
    synthetic_bars(&SyntheticSpec::new(800, 2024)).unwrap()
}

fn tuple_key(params: &std::collections::BTreeMap<String, f64>) -> Vec<(String, u64)> {
    params.iter().map(|(k, v)| (k.clone(), v.to_bits())).collect()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn two_by_two_grid_yields_four_ranked_rows() {
    let grid = ParamGrid::new()
        .with_axis("stop_loss", [0.01, 0.02])
        .with_axis("take_profit", [0.02, 0.04]);
    let base = StrategyConfig::new(StrategyKind::SignalLevel);
    let report = Optimizer::new(RunSettings::default())
        .optimize(&bars(), &base, &grid)
        .unwrap();

    assert_eq!(report.total_combinations, 4);
    assert_eq!(report.rows.len(), 4);
    assert!(!report.interrupted);
    assert_eq!(report.failed().count(), 0);

    let returns: Vec<f64> = report
        .rows
        .iter()
        .map(|r| r.metrics().unwrap().total_return)
        .collect();
    assert!(returns.windows(2).all(|w| w[0] >= w[1]), "{returns:?}");

    let tuples: HashSet<_> = report.rows.iter().map(|r| tuple_key(&r.params)).collect();
    assert_eq!(tuples.len(), 4);

    let ranks: Vec<usize> = report.rows.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    assert_eq!(report.best().unwrap().rank, 1);
}

#[test]
fn objective_changes_the_ordering_key() {
    let grid = ParamGrid::new().with_axis("position_size", [0.05, 0.1, 0.2]);
    let base = StrategyConfig::new(StrategyKind::Extreme).with_param("stop_loss", 0.02);
    let report = Optimizer::new(RunSettings::default())
        .with_objective(FitnessMetric::MaxDrawdown)
        .optimize(&bars(), &base, &grid)
        .unwrap();
    let drawdowns: Vec<f64> = report
        .completed()
        .map(|r| r.metrics().unwrap().max_drawdown)
        .collect();
    assert!(drawdowns.windows(2).all(|w| w[0] >= w[1]), "{drawdowns:?}");
}

#[test]
fn zero_time_budget_turns_every_row_into_a_timeout() {
    let grid = ParamGrid::new().with_axis("stop_loss", [0.01, 0.02]);
    let settings = RunSettings::default().with_time_budget(std::time::Duration::ZERO);
    let report = Optimizer::new(settings)
        .optimize(&bars(), &StrategyConfig::new(StrategyKind::Momentum), &grid)
        .unwrap();
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.failed().count(), 2);
    assert!(report.best().is_none());
}

#[test]
fn unknown_grid_parameter_fails_rows_not_the_search() {
    let grid = ParamGrid::new().with_axis("bb_period", [10.0, 20.0]);
    let report = Optimizer::new(RunSettings::default())
        .optimize(&bars(), &StrategyConfig::new(StrategyKind::Extreme), &grid)
        .unwrap();
    assert_eq!(report.failed().count(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn combinations_are_the_full_product_without_duplicates(
        axes in prop::collection::btree_map(
            "[a-e]{1,3}",
            prop::collection::vec(-100i32..100, 1..4),
            0..4,
        )
    ) {
        let grid = axes.iter().fold(ParamGrid::new(), |grid, (name, values)| {
            grid.with_axis(name, values.iter().map(|v| f64::from(*v)))
        });
        let expected: usize = grid.axes().values().map(Vec::len).product();
        let combos: Vec<_> = grid.combinations().collect();
        prop_assert_eq!(combos.len(), expected);
        prop_assert_eq!(grid.size(), expected);
        let unique: HashSet<_> = combos.iter().map(tuple_key).collect();
        prop_assert_eq!(unique.len(), expected);
        for combo in &combos {
            prop_assert_eq!(combo.len(), grid.axes().len());
        }
    }
}
