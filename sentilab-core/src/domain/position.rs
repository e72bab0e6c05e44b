use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the single live position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Flat,
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which entry directions a run may take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingMode {
    LongOnly,
    ShortOnly,
    #[default]
    LongShort,
}

impl TradingMode {
    pub fn allows(self, direction: Direction) -> bool {
        match (self, direction) {
            (_, Direction::Flat) => false,
            (Self::LongShort, _) => true,
            (Self::LongOnly, Direction::Long) => true,
            (Self::ShortOnly, Direction::Short) => true,
            _ => false,
        }
    }
}

/// The single position a run can hold.
///
/// `size` is the quantity in units of the instrument; exposure is
/// `direction.sign() * size`, so it is always one of `{-size, 0, +size}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_index: usize,
    pub size: f64,
}

impl PositionState {
    pub fn flat() -> Self {
        Self {
            direction: Direction::Flat,
            entry_price: 0.0,
            entry_index: 0,
            size: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
    }

    pub fn is_open(&self) -> bool {
        !self.is_flat()
    }

    pub fn exposure(&self) -> f64 {
        self.direction.sign() * self.size
    }

    /// Mark-to-market value of the position at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.exposure() * price
    }

    /// Unrealized return relative to the entry price, signed by direction.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        if self.is_flat() || self.entry_price <= 0.0 {
            return 0.0;
        }
        self.direction.sign() * (price - self.entry_price) / self.entry_price
    }

    pub fn bars_held(&self, bar_index: usize) -> usize {
        if self.is_flat() {
            return 0;
        }
        bar_index.saturating_sub(self.entry_index)
    }
}

impl Default for PositionState {
    fn default() -> Self {
        Self::flat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_at(price: f64) -> PositionState {
        PositionState {
            direction: Direction::Long,
            entry_price: price,
            entry_index: 3,
            size: 10.0,
        }
    }

    #[test]
    fn flat_has_zero_exposure() {
        let p = PositionState::flat();
        assert!(p.is_flat());
        assert_eq!(p.exposure(), 0.0);
        assert_eq!(p.market_value(123.0), 0.0);
    }

    #[test]
    fn short_exposure_is_negative() {
        let p = PositionState {
            direction: Direction::Short,
            ..long_at(50.0)
        };
        assert_eq!(p.exposure(), -10.0);
        assert!((p.unrealized_return(45.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn long_unrealized_and_holding() {
        let p = long_at(100.0);
        assert!((p.unrealized_return(110.0) - 0.1).abs() < 1e-12);
        assert_eq!(p.bars_held(8), 5);
    }

    #[test]
    fn trading_mode_filters_directions() {
        assert!(TradingMode::LongOnly.allows(Direction::Long));
        assert!(!TradingMode::LongOnly.allows(Direction::Short));
        assert!(TradingMode::ShortOnly.allows(Direction::Short));
        assert!(TradingMode::LongShort.allows(Direction::Short));
        assert!(!TradingMode::LongShort.allows(Direction::Flat));
    }
}
