//! Strategies: one `decide` interface over a closed set of variants.
//!
//! A strategy sees the current bar, the current position and its own
//! validated config. Any history it needs (rolling means, channels, previous
//! signal levels) lives in `RollingWindow`s it owns, refreshed by bar index.
//! Strategies never see cash or equity; sizing and forced exits belong to the
//! risk manager.

mod bollinger;
mod extreme;
mod layered;
mod momentum;
mod signal_level;
mod signal_reverse;
mod turtle;

pub use bollinger::{BollingerBands, BollingerConfig};
pub use extreme::{Extreme, ExtremeConfig};
pub use layered::{Band, Layered, LayeredConfig};
pub use momentum::{Momentum, MomentumConfig};
pub use signal_level::{SignalLevel, SignalLevelConfig};
pub use signal_reverse::{SignalLevelReverse, SignalLevelReverseConfig};
pub use turtle::{TurtleConfig, TurtleTrading};

use crate::config::{ensure_known_params, Params, StrategyConfig, StrategyKind};
use crate::domain::{Bar, PositionState};
use crate::engine::risk::RISK_PARAMS;
use crate::error::ConfigError;

/// What the strategy wants on this bar.
///
/// `OpenLong` while short (or `OpenShort` while long) is a reversal request:
/// the risk manager closes with `signal_reversal` and does not re-enter on
/// the same bar. An open request in the direction already held is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenLong,
    OpenShort,
    Close,
    Hold,
}

/// A sentiment or price strategy.
///
/// `decide` is called exactly once per bar, in bar order, including bars
/// where the position is open, so lookback buffers stay complete.
pub trait Strategy: Send {
    /// Human-readable name (e.g., "extreme").
    fn name(&self) -> &str;

    /// Bars needed before the strategy can emit anything but `Hold`.
    fn warmup_bars(&self) -> usize;

    /// Decide on bar `bar_index` given the position held going into it.
    fn decide(&mut self, bar_index: usize, bar: &Bar, position: &PositionState) -> Action;
}

/// Parameter names the variant for `kind` accepts, risk parameters excluded.
pub fn strategy_params(kind: StrategyKind) -> &'static [&'static str] {
    match kind {
        StrategyKind::SignalLevel => SignalLevelConfig::PARAMS,
        StrategyKind::Extreme => ExtremeConfig::PARAMS,
        StrategyKind::Momentum => MomentumConfig::PARAMS,
        StrategyKind::Layered => LayeredConfig::PARAMS,
        StrategyKind::BollingerBands => BollingerConfig::PARAMS,
        StrategyKind::TurtleTrading => TurtleConfig::PARAMS,
        StrategyKind::SignalLevelReverse => SignalLevelReverseConfig::PARAMS,
    }
}

/// Build the strategy a config describes.
///
/// Rejects parameter names that neither the variant nor the risk manager
/// understands, and any inconsistent thresholds.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, ConfigError> {
    ensure_known_params(config, &[strategy_params(config.kind), RISK_PARAMS])?;
    let params = Params::new(&config.params);
    let strategy: Box<dyn Strategy> = match config.kind {
        StrategyKind::SignalLevel => {
            Box::new(SignalLevel::new(SignalLevelConfig::from_params(&params)?))
        }
        StrategyKind::Extreme => Box::new(Extreme::new(ExtremeConfig::from_params(&params)?)),
        StrategyKind::Momentum => Box::new(Momentum::new(MomentumConfig::from_params(&params)?)),
        StrategyKind::Layered => Box::new(Layered::new(LayeredConfig::from_params(&params)?)),
        StrategyKind::BollingerBands => {
            Box::new(BollingerBands::new(BollingerConfig::from_params(&params)?))
        }
        StrategyKind::TurtleTrading => {
            Box::new(TurtleTrading::new(TurtleConfig::from_params(&params)?))
        }
        StrategyKind::SignalLevelReverse => Box::new(SignalLevelReverse::new(
            SignalLevelReverseConfig::from_params(&params)?,
        )),
    };
    Ok(strategy)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::Direction;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    pub fn ts(index: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::minutes(index as i64)
    }

    /// Flat-range bar at `close` with the given signal level.
    pub fn bar(index: usize, close: f64, signal: f64) -> Bar {
        Bar {
            timestamp: ts(index),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
            signal_level: signal,
            polarity: None,
            intensity: None,
            dominance: None,
        }
    }

    pub fn held(direction: Direction) -> PositionState {
        PositionState {
            direction,
            entry_price: 100.0,
            entry_index: 0,
            size: 1.0,
        }
    }

    /// Feed `bars` with a fixed position; return every action.
    pub fn decide_all(
        strategy: &mut dyn Strategy,
        bars: &[Bar],
        position: PositionState,
    ) -> Vec<Action> {
        bars.iter()
            .enumerate()
            .map(|(i, b)| strategy.decide(i, b, &position))
            .collect()
    }

    /// Signal-only bars at a constant price.
    pub fn signal_bars(signals: &[f64]) -> Vec<Bar> {
        signals
            .iter()
            .enumerate()
            .map(|(i, s)| bar(i, 100.0, *s))
            .collect()
    }

    /// Price-only bars at a neutral signal level.
    pub fn price_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i, *c, 5.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::domain::Direction;

    #[test]
    fn factory_builds_every_kind_with_defaults() {
        for kind in StrategyKind::ALL {
            let strategy = build_strategy(&StrategyConfig::new(kind)).unwrap();
            assert!(!strategy.name().is_empty());
        }
    }

    #[test]
    fn factory_rejects_unknown_param() {
        let config = StrategyConfig::new(StrategyKind::Extreme).with_param("bb_period", 20.0);
        let err = build_strategy(&config).err().unwrap();
        assert_eq!(
            err,
            ConfigError::UnknownParam {
                strategy: "extreme".into(),
                param: "bb_period".into()
            }
        );
    }

    #[test]
    fn factory_accepts_risk_params_for_any_kind() {
        for kind in StrategyKind::ALL {
            let config = StrategyConfig::new(kind)
                .with_param("stop_loss", 0.02)
                .with_param("position_size", 0.2);
            assert!(build_strategy(&config).is_ok(), "{kind}");
        }
    }

    #[test]
    fn repeated_bar_index_does_not_shift_history() {
        let bars = signal_bars(&[5.0, 5.0, 1.2, 1.2]);
        let mut once = build_strategy(&StrategyConfig::new(StrategyKind::Layered)).unwrap();
        let mut twice = build_strategy(&StrategyConfig::new(StrategyKind::Layered)).unwrap();
        let flat = held(Direction::Flat);
        let mut a = Vec::new();
        let mut b = Vec::new();
        for (i, bar) in bars.iter().enumerate() {
            a.push(once.decide(i, bar, &flat));
            twice.decide(i, bar, &flat);
            b.push(twice.decide(i, bar, &flat));
        }
        assert_eq!(a, b);
    }
}
