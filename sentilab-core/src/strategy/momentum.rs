//! Sentiment momentum.
//!
//! Momentum is the change in signal level over `momentum_period` bars. An
//! entry needs momentum of at least `momentum_threshold` in magnitude and a
//! crossing of `midband` in the same direction on this bar:
//!
//! - rising through the midband opens long,
//! - falling through the midband opens short.
//!
//! Entries are suppressed while the signal level is outside
//! `[min_signal_level, max_signal_level]`. A held position is reversed on the
//! opposite crossing and closed (`strategy_exit`) when momentum turns
//! against it without a crossing.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct MomentumConfig {
    pub momentum_period: usize,
    pub momentum_threshold: f64,
    pub midband: f64,
    pub min_signal_level: f64,
    pub max_signal_level: f64,
}

impl MomentumConfig {
    pub const PARAMS: &'static [&'static str] = &[
        "momentum_period",
        "momentum_threshold",
        "midband",
        "min_signal_level",
        "max_signal_level",
    ];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            momentum_period: p.usize("momentum_period", 3)?,
            momentum_threshold: p.f64("momentum_threshold", 0.5)?,
            midband: p.f64("midband", 5.0)?,
            min_signal_level: p.f64("min_signal_level", 2.0)?,
            max_signal_level: p.f64("max_signal_level", 8.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.momentum_period == 0 {
            return Err(invalid("momentum_period", 0.0, "must be >= 1"));
        }
        if self.momentum_threshold < 0.0 {
            return Err(invalid(
                "momentum_threshold",
                self.momentum_threshold,
                "must be >= 0",
            ));
        }
        if self.min_signal_level >= self.max_signal_level {
            return Err(inconsistent(
                StrategyKind::Momentum,
                format!(
                    "min_signal_level ({}) must be below max_signal_level ({})",
                    self.min_signal_level, self.max_signal_level
                ),
            ));
        }
        if !(self.min_signal_level..=self.max_signal_level).contains(&self.midband) {
            return Err(inconsistent(
                StrategyKind::Momentum,
                format!(
                    "midband ({}) must lie within [{}, {}]",
                    self.midband, self.min_signal_level, self.max_signal_level
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Momentum {
    config: MomentumConfig,
    signals: RollingWindow,
}

impl Momentum {
    pub fn new(config: MomentumConfig) -> Self {
        let signals = RollingWindow::new(config.momentum_period + 1);
        Self { config, signals }
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn warmup_bars(&self) -> usize {
        self.config.momentum_period
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.signals.observe(bar_index, bar.signal_level);
        let cfg = &self.config;
        let (Some(now), Some(prev), Some(base)) = (
            self.signals.latest(),
            self.signals.lag(1),
            self.signals.lag(cfg.momentum_period),
        ) else {
            return Action::Hold;
        };

        let momentum = now - base;
        let rising = momentum >= cfg.momentum_threshold;
        let falling = momentum <= -cfg.momentum_threshold;
        let rising_through = rising && prev < cfg.midband && now >= cfg.midband;
        let falling_through = falling && prev > cfg.midband && now <= cfg.midband;
        let in_range = (cfg.min_signal_level..=cfg.max_signal_level).contains(&now);

        match position.direction {
            Direction::Flat if rising_through && in_range => Action::OpenLong,
            Direction::Flat if falling_through && in_range => Action::OpenShort,
            Direction::Long if falling_through => Action::OpenShort,
            Direction::Long if falling => Action::Close,
            Direction::Short if rising_through => Action::OpenLong,
            Direction::Short if rising => Action::Close,
            _ => Action::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::collections::BTreeMap;

    fn strategy(params: &[(&str, f64)]) -> Result<Momentum, ConfigError> {
        let map: BTreeMap<String, f64> =
            params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        MomentumConfig::from_params(&Params::new(&map)).map(Momentum::new)
    }

    #[test]
    fn rising_through_midband_opens_long() {
        let mut s = strategy(&[("momentum_period", 2.0)]).unwrap();
        let bars = signal_bars(&[3.5, 4.0, 4.5, 5.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(
            actions,
            vec![Action::Hold, Action::Hold, Action::Hold, Action::OpenLong]
        );
    }

    #[test]
    fn falling_through_midband_opens_short() {
        let mut s = strategy(&[("momentum_period", 1.0)]).unwrap();
        let bars = signal_bars(&[6.0, 4.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions, vec![Action::Hold, Action::OpenShort]);
    }

    #[test]
    fn entries_suppressed_outside_signal_range() {
        let mut s = strategy(&[
            ("momentum_period", 1.0),
            ("max_signal_level", 6.0),
            ("midband", 5.0),
        ])
        .unwrap();
        let bars = signal_bars(&[4.0, 6.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions, vec![Action::Hold, Action::Hold]);
    }

    #[test]
    fn adverse_momentum_closes_long() {
        let mut s = strategy(&[("momentum_period", 1.0)]).unwrap();
        let bars = signal_bars(&[7.0, 6.0, 4.0]);
        let actions = decide_all(&mut s, &bars, held(Direction::Long));
        assert_eq!(actions, vec![Action::Hold, Action::Close, Action::OpenShort]);
    }

    #[test]
    fn rejects_inconsistent_bounds() {
        assert!(strategy(&[("min_signal_level", 8.0), ("max_signal_level", 2.0)]).is_err());
        assert!(strategy(&[("midband", 9.0)]).is_err());
        assert!(strategy(&[("momentum_period", 0.0)]).is_err());
    }
}
