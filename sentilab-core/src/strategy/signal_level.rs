//! Signal-level mean reversion.
//!
//! A high signal level means crowded optimism, so the strategy fades it:
//! short at or above `signal_threshold`, long at or below `low_threshold`
//! (default `10 - signal_threshold`). A held position is reversed when the
//! opposite threshold is reached.
//!
//! Optional price filter: with `price_band > 0`, entries require the close
//! to sit within `±price_band` of its `sma_period` moving average.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalLevelConfig {
    pub signal_threshold: f64,
    pub low_threshold: f64,
    pub price_band: f64,
    pub sma_period: usize,
}

impl SignalLevelConfig {
    pub const PARAMS: &'static [&'static str] =
        &["signal_threshold", "low_threshold", "price_band", "sma_period"];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let signal_threshold = p.f64("signal_threshold", 6.0)?;
        let config = Self {
            signal_threshold,
            low_threshold: p.f64("low_threshold", 10.0 - signal_threshold)?,
            price_band: p.f64("price_band", 0.0)?,
            sma_period: p.usize("sma_period", 20)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.low_threshold >= self.signal_threshold {
            return Err(inconsistent(
                StrategyKind::SignalLevel,
                format!(
                    "low_threshold ({}) must be below signal_threshold ({})",
                    self.low_threshold, self.signal_threshold
                ),
            ));
        }
        if self.price_band < 0.0 {
            return Err(invalid("price_band", self.price_band, "must be >= 0"));
        }
        if self.price_band > 0.0 && self.sma_period == 0 {
            return Err(invalid("sma_period", 0.0, "must be >= 1 when price_band is set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignalLevel {
    config: SignalLevelConfig,
    closes: RollingWindow,
}

impl SignalLevel {
    pub fn new(config: SignalLevelConfig) -> Self {
        let closes = RollingWindow::new(config.sma_period);
        Self { config, closes }
    }

    fn price_in_band(&self, close: f64) -> bool {
        if self.config.price_band == 0.0 {
            return true;
        }
        match self.closes.mean(self.config.sma_period) {
            Some(sma) if sma > 0.0 => (close / sma - 1.0).abs() <= self.config.price_band,
            _ => false,
        }
    }
}

impl Strategy for SignalLevel {
    fn name(&self) -> &str {
        "signal_level"
    }

    fn warmup_bars(&self) -> usize {
        if self.config.price_band > 0.0 {
            self.config.sma_period
        } else {
            0
        }
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.closes.observe(bar_index, bar.close);
        let high = bar.signal_level >= self.config.signal_threshold;
        let low = bar.signal_level <= self.config.low_threshold;

        match position.direction {
            Direction::Flat if !self.price_in_band(bar.close) => Action::Hold,
            Direction::Flat if high => Action::OpenShort,
            Direction::Flat if low => Action::OpenLong,
            Direction::Long if high => Action::OpenShort,
            Direction::Short if low => Action::OpenLong,
            _ => Action::Hold,
        }
    }
}
