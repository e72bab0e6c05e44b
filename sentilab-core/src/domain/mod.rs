//! Domain types: bars, positions, trades and run results.

pub mod bar;
pub mod ids;
pub mod position;
pub mod result;
pub mod trade;

pub use bar::{Bar, BarSeries};
pub use ids::{DatasetHash, FullHash};
pub use position::{Direction, PositionState, TradingMode};
pub use result::{BacktestResult, EquityPoint, SCHEMA_VERSION};
pub use trade::{ExitReason, TradeRecord};
