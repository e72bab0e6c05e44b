//! Extreme-sentiment strategy.
//!
//! Long when the signal level sits in `[1, low_threshold]`, short when it
//! sits in `[high_threshold, 10]`, nothing in between. An entry needs the
//! extreme to persist for `min_extreme_duration` consecutive bars; a held
//! position is reversed as soon as the opposite extreme prints.

use crate::config::{inconsistent, invalid, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;

use super::{Action, Strategy};

const SIGNAL_FLOOR: f64 = 1.0;
const SIGNAL_CEILING: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtremeConfig {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub min_extreme_duration: usize,
}

impl ExtremeConfig {
    pub const PARAMS: &'static [&'static str] =
        &["low_threshold", "high_threshold", "min_extreme_duration"];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            low_threshold: p.f64("low_threshold", 2.5)?,
            high_threshold: p.f64("high_threshold", 7.5)?,
            min_extreme_duration: p.usize("min_extreme_duration", 1)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.low_threshold >= self.high_threshold {
            return Err(inconsistent(
                StrategyKind::Extreme,
                format!(
                    "low_threshold ({}) must be below high_threshold ({})",
                    self.low_threshold, self.high_threshold
                ),
            ));
        }
        if self.low_threshold < SIGNAL_FLOOR {
            return Err(invalid("low_threshold", self.low_threshold, "must be >= 1"));
        }
        if self.high_threshold > SIGNAL_CEILING {
            return Err(invalid("high_threshold", self.high_threshold, "must be <= 10"));
        }
        if self.min_extreme_duration == 0 {
            return Err(invalid("min_extreme_duration", 0.0, "must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Low,
    Neutral,
    High,
}

#[derive(Debug, Clone)]
pub struct Extreme {
    config: ExtremeConfig,
    low_run: usize,
    high_run: usize,
    zone: Zone,
    last_index: Option<usize>,
}

impl Extreme {
    pub fn new(config: ExtremeConfig) -> Self {
        Self {
            config,
            low_run: 0,
            high_run: 0,
            zone: Zone::Neutral,
            last_index: None,
        }
    }

    fn zone_of(&self, signal: f64) -> Zone {
        if (SIGNAL_FLOOR..=self.config.low_threshold).contains(&signal) {
            Zone::Low
        } else if (self.config.high_threshold..=SIGNAL_CEILING).contains(&signal) {
            Zone::High
        } else {
            Zone::Neutral
        }
    }

    fn observe(&mut self, bar_index: usize, signal: f64) {
        if matches!(self.last_index, Some(last) if bar_index <= last) {
            return;
        }
        self.last_index = Some(bar_index);
        self.zone = self.zone_of(signal);
        match self.zone {
            Zone::Low => {
                self.low_run += 1;
                self.high_run = 0;
            }
            Zone::High => {
                self.high_run += 1;
                self.low_run = 0;
            }
            Zone::Neutral => {
                self.low_run = 0;
                self.high_run = 0;
            }
        }
    }
}

impl Strategy for Extreme {
    fn name(&self) -> &str {
        "extreme"
    }

    fn warmup_bars(&self) -> usize {
        self.config.min_extreme_duration - 1
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.observe(bar_index, bar.signal_level);
        let needed = self.config.min_extreme_duration;

        match position.direction {
            Direction::Flat if self.low_run >= needed => Action::OpenLong,
            Direction::Flat if self.high_run >= needed => Action::OpenShort,
            Direction::Long if self.zone == Zone::High => Action::OpenShort,
            Direction::Short if self.zone == Zone::Low => Action::OpenLong,
            _ => Action::Hold,
        }
    }
}
