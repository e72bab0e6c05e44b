//! Turtle channel breakout.
//!
//! Long when the close breaks above the highest high of the previous
//! `entry_period` bars, short when it breaks below the lowest low. A long is
//! closed when the close falls below the lowest low of the previous
//! `exit_period` bars; a short when it rises above the highest high.
//! Channels always exclude the current bar.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct TurtleConfig {
    pub entry_period: usize,
    pub exit_period: usize,
}

impl TurtleConfig {
    pub const PARAMS: &'static [&'static str] = &["entry_period", "exit_period"];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            entry_period: p.usize("entry_period", 20)?,
            exit_period: p.usize("exit_period", 10)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_period == 0 {
            return Err(invalid("entry_period", 0.0, "must be >= 1"));
        }
        if self.exit_period == 0 {
            return Err(invalid("exit_period", 0.0, "must be >= 1"));
        }
        if self.exit_period > self.entry_period {
            return Err(inconsistent(
                StrategyKind::TurtleTrading,
                format!(
                    "exit_period ({}) must not exceed entry_period ({})",
                    self.exit_period, self.entry_period
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TurtleTrading {
    config: TurtleConfig,
    highs: RollingWindow,
    lows: RollingWindow,
}

impl TurtleTrading {
    pub fn new(config: TurtleConfig) -> Self {
        // One extra slot so the channel can skip the current bar.
        let capacity = config.entry_period + 1;
        Self {
            config,
            highs: RollingWindow::new(capacity),
            lows: RollingWindow::new(capacity),
        }
    }
}

impl Strategy for TurtleTrading {
    fn name(&self) -> &str {
        "turtle_trading"
    }

    fn warmup_bars(&self) -> usize {
        self.config.entry_period
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.highs.observe(bar_index, bar.high);
        self.lows.observe(bar_index, bar.low);
        let close = bar.close;

        match position.direction {
            Direction::Flat => {
                let (Some(upper), Some(lower)) = (
                    self.highs.max_preceding(self.config.entry_period),
                    self.lows.min_preceding(self.config.entry_period),
                ) else {
                    return Action::Hold;
                };
                if close > upper {
                    Action::OpenLong
                } else if close < lower {
                    Action::OpenShort
                } else {
                    Action::Hold
                }
            }
            Direction::Long => match self.lows.min_preceding(self.config.exit_period) {
                Some(exit_low) if close < exit_low => Action::Close,
                _ => Action::Hold,
            },
            Direction::Short => match self.highs.max_preceding(self.config.exit_period) {
                Some(exit_high) if close > exit_high => Action::Close,
                _ => Action::Hold,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::collections::BTreeMap;

    fn strategy(entry: f64, exit: f64) -> Result<TurtleTrading, ConfigError> {
        let mut map = BTreeMap::new();
        map.insert("entry_period".to_string(), entry);
        map.insert("exit_period".to_string(), exit);
        TurtleConfig::from_params(&Params::new(&map)).map(TurtleTrading::new)
    }

    #[test]
    fn breakout_above_channel_opens_long() {
        let mut s = strategy(3.0, 2.0).unwrap();
        let bars = price_bars(&[100.0, 102.0, 101.0, 103.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(
            actions,
            vec![Action::Hold, Action::Hold, Action::Hold, Action::OpenLong]
        );
    }

    #[test]
    fn breakdown_below_channel_opens_short() {
        let mut s = strategy(2.0, 1.0).unwrap();
        let bars = price_bars(&[100.0, 99.0, 98.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions[2], Action::OpenShort);
    }

    #[test]
    fn equal_to_channel_is_not_a_breakout() {
        let mut s = strategy(2.0, 1.0).unwrap();
        let bars = price_bars(&[100.0, 101.0, 101.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions[2], Action::Hold);
    }

    #[test]
    fn long_exits_on_exit_channel() {
        let mut s = strategy(3.0, 2.0).unwrap();
        let bars = price_bars(&[100.0, 104.0, 103.0, 102.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Long));
        assert_eq!(
            actions,
            vec![Action::Hold, Action::Hold, Action::Hold, Action::Close]
        );
    }

    #[test]
    fn rejects_exit_longer_than_entry() {
        let err = strategy(10.0, 20.0).unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent { .. }));
        assert!(strategy(0.0, 0.0).is_err());
    }
}
