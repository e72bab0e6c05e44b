//! Contrarian long-only strategy on depressed sentiment.
//!
//! Buys fear. From flat it opens long when any of these hold:
//! - the signal level is at or below `signal_level_threshold` and the bar
//!   carries negative polarity, high intensity or low dominance,
//! - the signal level collapsed below `drop_ratio` × the previous level and
//!   sits at or below `drop_level`,
//! - the close slipped more than `pullback` below the previous close while
//!   polarity is at or below `polarity_threshold`.
//!
//! A long is closed once sentiment recovers: signal above `exit_level`,
//! positive polarity or high intensity on an elevated signal, or
//! `elevated_run` consecutive bars at or above `elevated_level`.
//! Missing PAD dimensions never satisfy a condition.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalLevelReverseConfig {
    pub signal_level_threshold: f64,
    pub polarity_threshold: f64,
    pub intensity_threshold: f64,
    pub dominance_threshold: f64,
    pub drop_ratio: f64,
    pub drop_level: f64,
    pub pullback: f64,
    pub exit_level: f64,
    pub elevated_level: f64,
    pub elevated_run: usize,
    pub polarity_exit: f64,
    pub intensity_exit: f64,
}

impl SignalLevelReverseConfig {
    pub const PARAMS: &'static [&'static str] = &[
        "signal_level_threshold",
        "polarity_threshold",
        "intensity_threshold",
        "dominance_threshold",
        "drop_ratio",
        "drop_level",
        "pullback",
        "exit_level",
        "elevated_level",
        "elevated_run",
        "polarity_exit",
        "intensity_exit",
    ];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            signal_level_threshold: p.f64("signal_level_threshold", 1.0)?,
            polarity_threshold: p.f64("polarity_threshold", -15.0)?,
            intensity_threshold: p.f64("intensity_threshold", 10.0)?,
            dominance_threshold: p.f64("dominance_threshold", -3.0)?,
            drop_ratio: p.f64("drop_ratio", 0.8)?,
            drop_level: p.f64("drop_level", 2.0)?,
            pullback: p.f64("pullback", 0.002)?,
            exit_level: p.f64("exit_level", 3.0)?,
            elevated_level: p.f64("elevated_level", 4.0)?,
            elevated_run: p.usize("elevated_run", 3)?,
            polarity_exit: p.f64("polarity_exit", 10.0)?,
            intensity_exit: p.f64("intensity_exit", 20.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.signal_level_threshold >= self.exit_level {
            return Err(inconsistent(
                StrategyKind::SignalLevelReverse,
                format!(
                    "signal_level_threshold ({}) must be below exit_level ({})",
                    self.signal_level_threshold, self.exit_level
                ),
            ));
        }
        if !(self.drop_ratio > 0.0 && self.drop_ratio < 1.0) {
            return Err(invalid("drop_ratio", self.drop_ratio, "must be in (0, 1)"));
        }
        if self.pullback < 0.0 {
            return Err(invalid("pullback", self.pullback, "must be >= 0"));
        }
        if self.elevated_run == 0 {
            return Err(invalid("elevated_run", 0.0, "must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignalLevelReverse {
    config: SignalLevelReverseConfig,
    signals: RollingWindow,
    closes: RollingWindow,
    elevated: usize,
}

impl SignalLevelReverse {
    pub fn new(config: SignalLevelReverseConfig) -> Self {
        Self {
            config,
            signals: RollingWindow::new(2),
            closes: RollingWindow::new(2),
            elevated: 0,
        }
    }

    fn entry_signal(&self, bar: &Bar) -> bool {
        let cfg = &self.config;
        let level = bar.signal_level;
        let below = |v: Option<f64>, t: f64| v.is_some_and(|x| x <= t);
        let above = |v: Option<f64>, t: f64| v.is_some_and(|x| x >= t);

        let fearful = level <= cfg.signal_level_threshold
            && (below(bar.polarity, cfg.polarity_threshold)
                || above(bar.intensity, cfg.intensity_threshold)
                || below(bar.dominance, cfg.dominance_threshold));
        let collapsed = self
            .signals
            .lag(1)
            .is_some_and(|prev| level < prev * cfg.drop_ratio && level <= cfg.drop_level);
        let pulled_back = self
            .closes
            .lag(1)
            .is_some_and(|prev| bar.close < prev * (1.0 - cfg.pullback))
            && below(bar.polarity, cfg.polarity_threshold);

        fearful || collapsed || pulled_back
    }

    fn exit_signal(&self, bar: &Bar) -> bool {
        let cfg = &self.config;
        let level = bar.signal_level;
        let elevated = level >= cfg.elevated_level;
        level > cfg.exit_level
            || (elevated && bar.polarity.is_some_and(|p| p > cfg.polarity_exit))
            || (elevated && bar.intensity.is_some_and(|i| i > cfg.intensity_exit))
            || self.elevated >= cfg.elevated_run
    }
}

impl Strategy for SignalLevelReverse {
    fn name(&self) -> &str {
        "signal_level_reverse"
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        if self.signals.observe(bar_index, bar.signal_level) {
            self.closes.observe(bar_index, bar.close);
            if bar.signal_level >= self.config.elevated_level {
                self.elevated += 1;
            } else {
                self.elevated = 0;
            }
        }

        match position.direction {
            Direction::Flat if self.entry_signal(bar) => Action::OpenLong,
            Direction::Long if self.exit_signal(bar) => Action::Close,
            Direction::Short => Action::Close,
            _ => Action::Hold,
        }
    }
}
