//! SentiLab Core: bars, loader, sentiment strategies, risk manager, simulation loop.
//!
//! This crate contains the backtesting engine:
//! - Domain types (bars, positions, trades, equity points, results)
//! - Tabular loading with a column alias table (CSV/Parquet via Polars)
//! - Seven strategy variants behind one `decide` interface
//! - Single-position risk manager (stop-loss, take-profit, max holding, gates)
//! - Deterministic bar-by-bar simulation

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod strategy;
pub mod window;

pub use config::{ExitRule, StrategyConfig, StrategyKind};
pub use domain::{BacktestResult, Bar, BarSeries, Direction, ExitReason, TradeRecord};
pub use engine::{run, simulate, CostModel, RunSettings};
pub use error::{BacktestError, ConfigError, DataIntegrityError, SchemaError, SimulationError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the optimizer shares or returns across
    /// worker threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::BacktestResult>();
        require_sync::<domain::BacktestResult>();
        require_send::<domain::TradeRecord>();
        require_sync::<domain::TradeRecord>();

        require_send::<config::StrategyConfig>();
        require_sync::<config::StrategyConfig>();
        require_send::<engine::RunSettings>();
        require_sync::<engine::RunSettings>();
        require_send::<engine::RiskConfig>();
        require_sync::<engine::RiskConfig>();

        require_send::<error::BacktestError>();
        require_sync::<error::BacktestError>();

        // Strategies only need to move into a worker.
        require_send::<Box<dyn strategy::Strategy>>();
    }

    /// Strategies never see cash or equity: `decide` takes the bar and the
    /// position only. This breaks loudly if the signature grows.
    #[test]
    fn strategy_trait_has_no_equity_parameter() {
        fn _check(
            s: &mut dyn strategy::Strategy,
            bar: &domain::Bar,
            pos: &domain::PositionState,
        ) -> strategy::Action {
            s.decide(0, bar, pos)
        }
    }
}
