//! TradeRecord: one completed round trip.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::Direction;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalReversal,
    MaxHolding,
    StrategyExit,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        Self::StopLoss,
        Self::TakeProfit,
        Self::SignalReversal,
        Self::MaxHolding,
        Self::StrategyExit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::SignalReversal => "signal_reversal",
            Self::MaxHolding => "max_holding",
            Self::StrategyExit => "strategy_exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry paired with its exit.
///
/// Prices are reference fills (bar close or trigger level); friction is
/// carried separately in `costs` so `pnl = gross_pnl - costs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub direction: Direction,

    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    pub size: f64,
    pub gross_pnl: f64,
    pub costs: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl TradeRecord {
    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    /// Price move in the trade's favour, before costs.
    pub fn price_return(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.direction.sign() * (self.exit_price - self.entry_price) / self.entry_price
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_trade(direction: Direction, exit_price: f64) -> TradeRecord {
        let day = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let size = 10.0;
        let gross = direction.sign() * (exit_price - 100.0) * size;
        TradeRecord {
            direction,
            entry_index: 2,
            entry_time: day.and_hms_opt(10, 0, 0).unwrap(),
            entry_price: 100.0,
            exit_index: 6,
            exit_time: day.and_hms_opt(10, 4, 0).unwrap(),
            exit_price,
            size,
            gross_pnl: gross,
            costs: 2.0,
            pnl: gross - 2.0,
            exit_reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn long_winner() {
        let t = sample_trade(Direction::Long, 104.0);
        assert!(t.is_winner());
        assert_eq!(t.bars_held(), 4);
        assert!((t.return_pct() - 0.038).abs() < 1e-12);
        assert!((t.price_return() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn short_price_return_is_inverted() {
        let t = sample_trade(Direction::Short, 96.0);
        assert!((t.price_return() - 0.04).abs() < 1e-12);
        assert!(t.is_winner());
    }

    #[test]
    fn exit_reason_serializes_snake_case() {
        let json = serde_json::to_string(&ExitReason::SignalReversal).unwrap();
        assert_eq!(json, "\"signal_reversal\"");
        for reason in ExitReason::ALL {
            assert_eq!(format!("\"{reason}\""), serde_json::to_string(&reason).unwrap());
        }
    }
}
