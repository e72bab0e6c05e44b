//! Bollinger band reversion on price alone.
//!
//! Bands are the `bb_period` mean of closes ± `bb_dev` population standard
//! deviations. Long at or below the lower band, exit at or above the upper
//! band. With `allow_short`, the upper band also opens shorts and the lower
//! band reverses them.
//!
//! With `trend_filter`, entries additionally need the fast SMA on the right
//! side of the slow SMA, and a position is closed when the two cross against it.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerConfig {
    pub bb_period: usize,
    pub bb_dev: f64,
    pub allow_short: bool,
    pub trend_filter: bool,
    pub fast_period: usize,
    pub slow_period: usize,
}

impl BollingerConfig {
    pub const PARAMS: &'static [&'static str] = &[
        "bb_period",
        "bb_dev",
        "allow_short",
        "trend_filter",
        "fast_period",
        "slow_period",
    ];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            bb_period: p.usize("bb_period", 20)?,
            bb_dev: p.f64("bb_dev", 2.0)?,
            allow_short: p.flag("allow_short", false)?,
            trend_filter: p.flag("trend_filter", false)?,
            fast_period: p.usize("fast_period", 10)?,
            slow_period: p.usize("slow_period", 20)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bb_period < 2 {
            return Err(invalid("bb_period", self.bb_period as f64, "must be >= 2"));
        }
        if self.bb_dev <= 0.0 {
            return Err(invalid("bb_dev", self.bb_dev, "must be > 0"));
        }
        if self.trend_filter && (self.fast_period == 0 || self.fast_period >= self.slow_period) {
            return Err(inconsistent(
                StrategyKind::BollingerBands,
                format!(
                    "fast_period ({}) must be >= 1 and below slow_period ({})",
                    self.fast_period, self.slow_period
                ),
            ));
        }
        Ok(())
    }

    fn lookback(&self) -> usize {
        if self.trend_filter {
            self.bb_period.max(self.slow_period)
        } else {
            self.bb_period
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
    Sideways,
    Unfiltered,
}

#[derive(Debug, Clone)]
pub struct BollingerBands {
    config: BollingerConfig,
    closes: RollingWindow,
}

impl BollingerBands {
    pub fn new(config: BollingerConfig) -> Self {
        let closes = RollingWindow::new(config.lookback());
        Self { config, closes }
    }

    /// `(lower, upper)` once `bb_period` closes are in.
    fn bands(&self) -> Option<(f64, f64)> {
        let mid = self.closes.mean(self.config.bb_period)?;
        let sd = self.closes.std_dev(self.config.bb_period)?;
        let width = self.config.bb_dev * sd;
        Some((mid - width, mid + width))
    }

    fn trend(&self) -> Option<Trend> {
        if !self.config.trend_filter {
            return Some(Trend::Unfiltered);
        }
        let fast = self.closes.mean(self.config.fast_period)?;
        let slow = self.closes.mean(self.config.slow_period)?;
        Some(if fast > slow {
            Trend::Up
        } else if fast < slow {
            Trend::Down
        } else {
            Trend::Sideways
        })
    }
}

impl Strategy for BollingerBands {
    fn name(&self) -> &str {
        "bollinger_bands"
    }

    fn warmup_bars(&self) -> usize {
        self.config.lookback() - 1
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.closes.observe(bar_index, bar.close);
        let (Some((lower, upper)), Some(trend)) = (self.bands(), self.trend()) else {
            return Action::Hold;
        };
        let close = bar.close;
        let short_side = self.config.allow_short;
        let long_ok = matches!(trend, Trend::Up | Trend::Unfiltered);
        let short_ok = matches!(trend, Trend::Down | Trend::Unfiltered);

        match position.direction {
            Direction::Flat if close <= lower && long_ok => Action::OpenLong,
            Direction::Flat if short_side && close >= upper && short_ok => Action::OpenShort,
            Direction::Long if close >= upper && short_side => Action::OpenShort,
            Direction::Long if close >= upper || trend == Trend::Down => Action::Close,
            Direction::Short if close <= lower => Action::OpenLong,
            Direction::Short if trend == Trend::Up => Action::Close,
            _ => Action::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::collections::BTreeMap;

    fn strategy(params: &[(&str, f64)]) -> Result<BollingerBands, ConfigError> {
        let map: BTreeMap<String, f64> =
            params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        BollingerConfig::from_params(&Params::new(&map)).map(BollingerBands::new)
    }

    #[test]
    fn holds_during_warmup() {
        let mut s = strategy(&[("bb_period", 5.0)]).unwrap();
        let bars = price_bars(&[100.0, 90.0, 80.0, 70.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert!(actions.iter().all(|a| *a == Action::Hold));
    }

    #[test]
    fn close_below_lower_band_opens_long() {
        let mut s = strategy(&[("bb_period", 4.0), ("bb_dev", 1.0)]).unwrap();
        let bars = price_bars(&[100.0, 101.0, 100.0, 90.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions[3], Action::OpenLong);
    }

    #[test]
    fn long_closes_at_upper_band() {
        let mut s = strategy(&[("bb_period", 4.0), ("bb_dev", 1.0)]).unwrap();
        let bars = price_bars(&[100.0, 99.0, 100.0, 110.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Long));
        assert_eq!(actions[3], Action::Close);
    }

    #[test]
    fn short_side_is_opt_in() {
        let bars = price_bars(&[100.0, 99.0, 100.0, 110.0]);
        let mut long_only = strategy(&[("bb_period", 4.0), ("bb_dev", 1.0)]).unwrap();
        assert_eq!(decide_all(&mut long_only, &bars, held(Direction::Flat))[3], Action::Hold);
        let mut both = strategy(&[("bb_period", 4.0), ("bb_dev", 1.0), ("allow_short", 1.0)]).unwrap();
        assert_eq!(decide_all(&mut both, &bars, held(Direction::Flat))[3], Action::OpenShort);
    }

    #[test]
    fn trend_filter_blocks_counter_trend_long() {
        let mut s = strategy(&[
            ("bb_period", 4.0),
            ("bb_dev", 1.0),
            ("trend_filter", 1.0),
            ("fast_period", 2.0),
            ("slow_period", 4.0),
        ])
        .unwrap();
        // Falling market: fast SMA below slow SMA, so the lower-band touch is ignored.
        let bars = price_bars(&[100.0, 98.0, 96.0, 90.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions[3], Action::Hold);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(strategy(&[("bb_period", 1.0)]).is_err());
        assert!(strategy(&[("bb_dev", 0.0)]).is_err());
        assert!(strategy(&[("trend_filter", 1.0), ("fast_period", 30.0)]).is_err());
        assert!(strategy(&[("allow_short", 0.5)]).is_err());
    }
}
