//! Layered sentiment bands.
//!
//! The signal scale is cut into five bands by four ascending edges:
//!
//! ```text
//!  extreme_low |   low   |  neutral  |   high   | extreme_high
//!         ≤ extreme_low  ≤ low        < high     < extreme_high ≤
//! ```
//!
//! Entry rules per band:
//! - extreme-low / extreme-high: enter unconditionally (long / short),
//! - low: enter long only while the signal is still falling,
//! - high: enter short only while the signal is still rising,
//! - neutral: never enter.
//!
//! A held long is reversed once the signal reaches the high side and closed
//! when it recovers into neutral while rising; shorts mirror this.

use crate::config::{inconsistent, Params, StrategyKind};
use crate::domain::{Bar, Direction, PositionState};
use crate::error::ConfigError;
use crate::window::RollingWindow;

use super::{Action, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    ExtremeLow,
    Low,
    Neutral,
    High,
    ExtremeHigh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayeredConfig {
    pub extreme_low: f64,
    pub low: f64,
    pub high: f64,
    pub extreme_high: f64,
}

impl LayeredConfig {
    pub const PARAMS: &'static [&'static str] = &["extreme_low", "low", "high", "extreme_high"];

    pub fn from_params(p: &Params<'_>) -> Result<Self, ConfigError> {
        let config = Self {
            extreme_low: p.f64("extreme_low", 2.0)?,
            low: p.f64("low", 4.0)?,
            high: p.f64("high", 6.0)?,
            extreme_high: p.f64("extreme_high", 8.0)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let edges = [self.extreme_low, self.low, self.high, self.extreme_high];
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(inconsistent(
                StrategyKind::Layered,
                format!(
                    "band edges must ascend strictly: extreme_low {} < low {} < high {} < extreme_high {}",
                    self.extreme_low, self.low, self.high, self.extreme_high
                ),
            ));
        }
        Ok(())
    }

    pub fn band(&self, signal: f64) -> Band {
        if signal <= self.extreme_low {
            Band::ExtremeLow
        } else if signal <= self.low {
            Band::Low
        } else if signal < self.high {
            Band::Neutral
        } else if signal < self.extreme_high {
            Band::High
        } else {
            Band::ExtremeHigh
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layered {
    config: LayeredConfig,
    signals: RollingWindow,
}

impl Layered {
    pub fn new(config: LayeredConfig) -> Self {
        Self {
            config,
            signals: RollingWindow::new(2),
        }
    }
}

impl Strategy for Layered {
    fn name(&self) -> &str {
        "layered"
    }

    fn warmup_bars(&self) -> usize {
        1
    }

    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action {
        self.signals.observe(bar_index, bar.signal_level);
        let now = bar.signal_level;
        let change = self.signals.lag(1).map_or(0.0, |prev| now - prev);
        let band = self.config.band(now);

        match (position.direction, band) {
            (Direction::Flat, Band::ExtremeLow) => Action::OpenLong,
            (Direction::Flat, Band::Low) if change < 0.0 => Action::OpenLong,
            (Direction::Flat, Band::ExtremeHigh) => Action::OpenShort,
            (Direction::Flat, Band::High) if change > 0.0 => Action::OpenShort,
            (Direction::Long, Band::High | Band::ExtremeHigh) => Action::OpenShort,
            (Direction::Long, Band::Neutral) if change > 0.0 => Action::Close,
            (Direction::Short, Band::Low | Band::ExtremeLow) => Action::OpenLong,
            (Direction::Short, Band::Neutral) if change < 0.0 => Action::Close,
            _ => Action::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::collections::BTreeMap;

    fn strategy(params: &[(&str, f64)]) -> Result<Layered, ConfigError> {
        let map: BTreeMap<String, f64> =
            params.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        LayeredConfig::from_params(&Params::new(&map)).map(Layered::new)
    }

    #[test]
    fn bands_partition_the_scale() {
        let cfg = strategy(&[]).unwrap().config;
        assert_eq!(cfg.band(1.0), Band::ExtremeLow);
        assert_eq!(cfg.band(2.0), Band::ExtremeLow);
        assert_eq!(cfg.band(3.0), Band::Low);
        assert_eq!(cfg.band(5.0), Band::Neutral);
        assert_eq!(cfg.band(6.0), Band::High);
        assert_eq!(cfg.band(8.0), Band::ExtremeHigh);
    }

    #[test]
    fn extremes_enter_unconditionally() {
        let mut s = strategy(&[]).unwrap();
        let actions = decide_all(&mut s, &signal_bars(&[1.0, 9.0]), held(Direction::Flat));
        assert_eq!(actions, vec![Action::OpenLong, Action::OpenShort]);
    }

    #[test]
    fn low_band_needs_falling_signal() {
        let mut s = strategy(&[]).unwrap();
        let bars = signal_bars(&[3.0, 3.5, 3.2]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions, vec![Action::Hold, Action::Hold, Action::OpenLong]);
    }

    #[test]
    fn high_band_needs_rising_signal() {
        let mut s = strategy(&[]).unwrap();
        let bars = signal_bars(&[7.0, 6.5, 7.2]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert_eq!(actions, vec![Action::Hold, Action::Hold, Action::OpenShort]);
    }

    #[test]
    fn neutral_never_enters() {
        let mut s = strategy(&[]).unwrap();
        let bars = signal_bars(&[4.5, 5.5, 4.2, 5.9]);
        let actions = decide_all(&mut s, &bars, held(Direction::Flat));
        assert!(actions.iter().all(|a| *a == Action::Hold));
    }

    #[test]
    fn long_exits_on_recovery_and_reverses_on_high() {
        let mut s = strategy(&[]).unwrap();
        let bars = signal_bars(&[3.0, 4.5, 4.4, 6.5]);
        let actions = decide_all(&mut s, &bars, held(Direction::Long));
        assert_eq!(
            actions,
            vec![Action::Hold, Action::Close, Action::Hold, Action::OpenShort]
        );
    }

    #[test]
    fn rejects_unordered_edges() {
        let err = strategy(&[("low", 7.0)]).unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent { .. }));
    }
}
