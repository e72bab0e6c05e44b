//! Strategy catalog: description, default parameters and default
//! optimization grid for every strategy.
//!
//! Compare mode runs each strategy with its defaults; optimize mode falls
//! back to the default grid when the config names none.

use sentilab_core::strategy::strategy_params;
use sentilab_core::{StrategyConfig, StrategyKind};

use crate::optimizer::ParamGrid;

/// Everything `--info` prints about one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyProfile {
    pub kind: StrategyKind,
    pub description: &'static str,
    pub defaults: &'static [(&'static str, f64)],
    pub grid: &'static [(&'static str, &'static [f64])],
}

impl StrategyProfile {
    /// Strategy-specific parameter names (risk parameters excluded).
    pub fn params(&self) -> &'static [&'static str] {
        strategy_params(self.kind)
    }

    pub fn default_config(&self) -> StrategyConfig {
        self.defaults
            .iter()
            .fold(StrategyConfig::new(self.kind), |config, (name, value)| {
                config.with_param(name, *value)
            })
    }

    pub fn default_grid(&self) -> ParamGrid {
        self.grid
            .iter()
            .fold(ParamGrid::new(), |grid, (name, values)| {
                grid.with_axis(name, values.iter().copied())
            })
    }
}

const POSITION_SIZE_AXIS: (&str, &[f64]) = ("position_size", &[0.05, 0.1, 0.15]);
const STOP_LOSS_AXIS: (&str, &[f64]) = ("stop_loss", &[0.015, 0.02, 0.025]);
const TAKE_PROFIT_AXIS: (&str, &[f64]) = ("take_profit", &[0.03, 0.04, 0.05]);

pub fn profile(kind: StrategyKind) -> StrategyProfile {
    match kind {
        StrategyKind::SignalLevel => StrategyProfile {
            kind,
            description: "Mean reversion on the signal level: long at or below the low \
                          threshold, short at or above the signal threshold",
            defaults: &[
                ("signal_threshold", 6.0),
                ("position_size", 0.1),
                ("stop_loss", 0.02),
                ("take_profit", 0.04),
                ("max_holding_periods", 5.0),
            ],
            grid: &[
                ("signal_threshold", &[5.5, 6.0, 6.5]),
                POSITION_SIZE_AXIS,
                STOP_LOSS_AXIS,
                TAKE_PROFIT_AXIS,
            ],
        },
        StrategyKind::Extreme => StrategyProfile {
            kind,
            description: "Trades only extreme readings: long in [1, low], short in [high, 10]",
            defaults: &[
                ("low_threshold", 2.5),
                ("high_threshold", 7.5),
                ("position_size", 0.1),
                ("stop_loss", 0.02),
                ("take_profit", 0.04),
            ],
            grid: &[
                ("low_threshold", &[2.0, 2.5, 3.0]),
                ("high_threshold", &[7.0, 7.5, 8.0]),
                STOP_LOSS_AXIS,
                TAKE_PROFIT_AXIS,
            ],
        },
        StrategyKind::Momentum => StrategyProfile {
            kind,
            description: "Follows the change of the signal level over a lookback window",
            defaults: &[
                ("momentum_period", 3.0),
                ("momentum_threshold", 0.5),
                ("position_size", 0.1),
                ("stop_loss", 0.02),
                ("take_profit", 0.04),
            ],
            grid: &[
                ("momentum_period", &[2.0, 3.0, 5.0]),
                ("momentum_threshold", &[0.3, 0.5, 1.0]),
                STOP_LOSS_AXIS,
                TAKE_PROFIT_AXIS,
            ],
        },
        StrategyKind::Layered => StrategyProfile {
            kind,
            description: "Four signal bands: extreme bands enter, inner bands exit",
            defaults: &[
                ("extreme_low", 2.0),
                ("low", 4.0),
                ("high", 6.0),
                ("extreme_high", 8.0),
                ("position_size", 0.1),
                ("stop_loss", 0.02),
                ("take_profit", 0.04),
            ],
            grid: &[
                ("extreme_low", &[1.5, 2.0, 2.5]),
                ("extreme_high", &[7.5, 8.0, 8.5]),
                STOP_LOSS_AXIS,
                TAKE_PROFIT_AXIS,
            ],
        },
        StrategyKind::BollingerBands => StrategyProfile {
            kind,
            description: "Price mean reversion on Bollinger bands with an optional SMA trend filter",
            defaults: &[
                ("bb_period", 15.0),
                ("bb_dev", 1.8),
                ("trend_filter", 1.0),
                ("position_size", 0.3),
                ("stop_loss", 0.03),
                ("take_profit", 0.06),
                ("volume_confirmation", 1.2),
            ],
            grid: &[
                ("bb_period", &[15.0, 20.0, 25.0]),
                ("bb_dev", &[1.5, 1.8, 2.0, 2.5]),
                ("stop_loss", &[0.02, 0.03]),
                ("take_profit", &[0.04, 0.06]),
            ],
        },
        StrategyKind::TurtleTrading => StrategyProfile {
            kind,
            description: "Channel breakout: enter on an entry-period high/low break, exit on \
                          the opposite exit-period break",
            defaults: &[
                ("entry_period", 15.0),
                ("exit_period", 8.0),
                ("position_size", 0.25),
                ("volume_confirmation", 1.1),
            ],
            grid: &[
                ("entry_period", &[10.0, 15.0, 20.0]),
                ("exit_period", &[5.0, 8.0, 10.0]),
                ("position_size", &[0.15, 0.25]),
            ],
        },
        StrategyKind::SignalLevelReverse => StrategyProfile {
            kind,
            description: "Long-only contrarian entries on depressed signal with PAD confirmation \
                          or a sudden signal drop",
            defaults: &[
                ("signal_level_threshold", 1.0),
                ("position_size", 0.1),
                ("stop_loss", 0.02),
                ("take_profit", 0.04),
                ("cooldown_bars", 5.0),
            ],
            grid: &[
                ("signal_level_threshold", &[1.0, 1.5, 2.0]),
                ("exit_level", &[3.0, 4.0]),
                STOP_LOSS_AXIS,
                TAKE_PROFIT_AXIS,
            ],
        },
    }
}

/// Profiles for every strategy, in catalog order.
pub fn catalog() -> Vec<StrategyProfile> {
    StrategyKind::ALL.into_iter().map(profile).collect()
}
