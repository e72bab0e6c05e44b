//! Position & risk manager: the single-position state machine.
//!
//! States are flat, long and short; a run starts flat. On every bar the
//! manager either
//! 1. closes an open position when an exit rule fires (checked in the
//!    configured order, default stop-loss > take-profit > max-holding >
//!    strategy signal), or
//! 2. opens a position from flat when the strategy asks and every entry gate
//!    passes (trading mode, cooldown, volume confirmation, not the last bar),
//!
//! and never both: an exit returns the state to flat for the rest of the bar.
//! Sizing is `position_size × equity` at the bar close. Cash moves only on
//! entry and exit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::{invalid, ExitRule, Params, StrategyConfig};
use crate::domain::{Bar, Direction, ExitReason, PositionState, TradeRecord, TradingMode};
use crate::error::{ConfigError, SimulationError};
use crate::strategy::Action;
use crate::window::RollingWindow;

use super::costs::CostModel;

/// Parameter names every strategy accepts on top of its own.
pub const RISK_PARAMS: &[&str] = &[
    "position_size",
    "stop_loss",
    "take_profit",
    "max_holding_periods",
    "cooldown_bars",
    "volume_confirmation",
    "volume_period",
    "fill_at_close",
];

/// Price at which stop-loss and take-profit exits fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitFill {
    /// The stop / target level itself.
    #[default]
    TriggerLevel,
    /// The close of the bar that crossed the level.
    Close,
}

/// Entry gate: volume must exceed `multiplier ×` its `period`-bar mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeGate {
    pub period: usize,
    pub multiplier: f64,
}

/// Validated risk rules for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub position_size: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub max_holding_periods: Option<usize>,
    pub cooldown_bars: usize,
    pub volume_gate: Option<VolumeGate>,
    pub exit_fill: ExitFill,
    pub trading_mode: TradingMode,
    pub exit_order: Vec<ExitRule>,
}

impl RiskConfig {
    /// Read the shared risk parameters out of a strategy config.
    ///
    /// Zero disables `stop_loss`, `take_profit`, `max_holding_periods` and
    /// `volume_confirmation`.
    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        let p = Params::new(&config.params);
        let stop_loss = p.f64("stop_loss", 0.0)?;
        let take_profit = p.f64("take_profit", 0.0)?;
        let max_holding = p.usize("max_holding_periods", 0)?;
        let multiplier = p.f64("volume_confirmation", 0.0)?;
        let period = p.usize("volume_period", 20)?;

        if !(0.0..1.0).contains(&stop_loss) {
            return Err(invalid("stop_loss", stop_loss, "must be in [0, 1)"));
        }
        if take_profit < 0.0 {
            return Err(invalid("take_profit", take_profit, "must be >= 0"));
        }
        if multiplier < 0.0 {
            return Err(invalid("volume_confirmation", multiplier, "must be >= 0"));
        }
        if period == 0 {
            return Err(invalid("volume_period", 0.0, "must be >= 1"));
        }

        let risk = Self {
            position_size: p.f64("position_size", 0.1)?,
            stop_loss: (stop_loss > 0.0).then_some(stop_loss),
            take_profit: (take_profit > 0.0).then_some(take_profit),
            max_holding_periods: (max_holding > 0).then_some(max_holding),
            cooldown_bars: p.usize("cooldown_bars", 0)?,
            volume_gate: (multiplier > 0.0).then_some(VolumeGate { period, multiplier }),
            exit_fill: if p.flag("fill_at_close", false)? {
                ExitFill::Close
            } else {
                ExitFill::TriggerLevel
            },
            trading_mode: config.trading_mode,
            exit_order: config.exit_order.clone(),
        };
        risk.validate()?;
        Ok(risk)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(invalid(
                "position_size",
                self.position_size,
                "must be in (0, 1]",
            ));
        }
        let all = [
            ExitRule::StopLoss,
            ExitRule::TakeProfit,
            ExitRule::MaxHolding,
            ExitRule::Signal,
        ];
        let complete = self.exit_order.len() == all.len()
            && all.iter().all(|rule| self.exit_order.contains(rule));
        if !complete {
            return Err(ConfigError::InvalidSettings(format!(
                "exit_order must list each of stop_loss, take_profit, max_holding, signal exactly once, got {:?}",
                self.exit_order
            )));
        }
        Ok(())
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            position_size: 0.1,
            stop_loss: None,
            take_profit: None,
            max_holding_periods: None,
            cooldown_bars: 0,
            volume_gate: None,
            exit_fill: ExitFill::default(),
            trading_mode: TradingMode::default(),
            exit_order: crate::config::default_exit_order(),
        }
    }
}

/// What happened to the position on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Opened(Direction),
    Closed(ExitReason),
}

/// Owns the live position, cash and the trade log for one run.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    costs: CostModel,
    cash: f64,
    position: PositionState,
    entry_time: Option<NaiveDateTime>,
    entry_cost: f64,
    last_exit_index: Option<usize>,
    volumes: Option<RollingWindow>,
    trades: Vec<TradeRecord>,
}

impl RiskManager {
    pub fn new(config: RiskConfig, costs: CostModel, initial_cash: f64) -> Self {
        let volumes = config.volume_gate.map(|g| RollingWindow::new(g.period));
        Self {
            config,
            costs,
            cash: initial_cash,
            position: PositionState::flat(),
            entry_time: None,
            entry_cost: 0.0,
            last_exit_index: None,
            volumes,
            trades: Vec::new(),
        }
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<TradeRecord> {
        self.trades
    }

    /// Cash plus the position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    /// Apply one bar. At most one transition happens per bar.
    pub fn on_bar(
        &mut self,
        index: usize,
        bar: &Bar,
        action: Action,
        is_last: bool,
    ) -> Result<Transition, SimulationError> {
        if let Some(volumes) = self.volumes.as_mut() {
            volumes.observe(index, bar.volume);
        }

        if self.position.is_open() {
            return match self.exit_trigger(index, bar, action) {
                Some((reason, price)) => {
                    self.close(index, bar, price, reason)?;
                    Ok(Transition::Closed(reason))
                }
                None => Ok(Transition::None),
            };
        }

        let direction = match action {
            Action::OpenLong => Direction::Long,
            Action::OpenShort => Direction::Short,
            Action::Close | Action::Hold => return Ok(Transition::None),
        };
        if is_last || !self.entry_allowed(index, bar, direction) {
            return Ok(Transition::None);
        }
        let equity = self.equity(bar.close);
        if equity <= 0.0 {
            return Ok(Transition::None);
        }
        self.open(index, bar, direction, equity)?;
        Ok(Transition::Opened(direction))
    }

    /// Force-close whatever is still open at `bar`, reason `strategy_exit`.
    pub fn flush(&mut self, index: usize, bar: &Bar) -> Result<Transition, SimulationError> {
        if self.position.is_flat() {
            return Ok(Transition::None);
        }
        self.close(index, bar, bar.close, ExitReason::StrategyExit)?;
        Ok(Transition::Closed(ExitReason::StrategyExit))
    }

    // ─── Exit rules ─────────────────────────────────────────────────

    fn exit_trigger(&self, index: usize, bar: &Bar, action: Action) -> Option<(ExitReason, f64)> {
        let pos = &self.position;
        let long = pos.direction == Direction::Long;
        for rule in &self.config.exit_order {
            let fired = match rule {
                ExitRule::StopLoss => self.config.stop_loss.and_then(|sl| {
                    let level = pos.entry_price * if long { 1.0 - sl } else { 1.0 + sl };
                    let crossed = if long { bar.close <= level } else { bar.close >= level };
                    crossed.then(|| (ExitReason::StopLoss, self.fill_price(level, bar.close)))
                }),
                ExitRule::TakeProfit => self.config.take_profit.and_then(|tp| {
                    let level = pos.entry_price * if long { 1.0 + tp } else { 1.0 - tp };
                    let crossed = if long { bar.close >= level } else { bar.close <= level };
                    crossed.then(|| (ExitReason::TakeProfit, self.fill_price(level, bar.close)))
                }),
                ExitRule::MaxHolding => self.config.max_holding_periods.and_then(|limit| {
                    (pos.bars_held(index) >= limit).then_some((ExitReason::MaxHolding, bar.close))
                }),
                ExitRule::Signal => match (pos.direction, action) {
                    (Direction::Long, Action::OpenShort) | (Direction::Short, Action::OpenLong) => {
                        Some((ExitReason::SignalReversal, bar.close))
                    }
                    (_, Action::Close) => Some((ExitReason::StrategyExit, bar.close)),
                    _ => None,
                },
            };
            if fired.is_some() {
                return fired;
            }
        }
        None
    }

    fn fill_price(&self, level: f64, close: f64) -> f64 {
        match self.config.exit_fill {
            ExitFill::TriggerLevel => level,
            ExitFill::Close => close,
        }
    }

    // ─── Entry gates ────────────────────────────────────────────────

    fn entry_allowed(&self, index: usize, bar: &Bar, direction: Direction) -> bool {
        if !self.config.trading_mode.allows(direction) {
            return false;
        }
        if let Some(last_exit) = self.last_exit_index {
            if index <= last_exit + self.config.cooldown_bars {
                return false;
            }
        }
        match (self.config.volume_gate, self.volumes.as_ref()) {
            (Some(gate), Some(volumes)) => volumes
                .mean(gate.period)
                .is_some_and(|mean| bar.volume > gate.multiplier * mean),
            _ => true,
        }
    }

    // ─── Fills ──────────────────────────────────────────────────────

    fn open(
        &mut self,
        index: usize,
        bar: &Bar,
        direction: Direction,
        equity: f64,
    ) -> Result<(), SimulationError> {
        if self.position.is_open() {
            return Err(SimulationError::PositionAlreadyOpen {
                bar_index: index,
                direction: self.position.direction.as_str(),
            });
        }
        let notional = self.config.position_size * equity;
        let size = notional / bar.close;
        if !size.is_finite() || size <= 0.0 {
            return Err(SimulationError::InvalidSize {
                bar_index: index,
                size,
            });
        }
        let cost = self.costs.cost(notional);
        self.cash -= direction.sign() * notional + cost;
        self.entry_cost = cost;
        self.entry_time = Some(bar.timestamp);
        self.position = PositionState {
            direction,
            entry_price: bar.close,
            entry_index: index,
            size,
        };
        tracing::debug!(bar = index, %direction, price = bar.close, size, "open");
        Ok(())
    }

    fn close(
        &mut self,
        index: usize,
        bar: &Bar,
        price: f64,
        reason: ExitReason,
    ) -> Result<(), SimulationError> {
        let pos = self.position;
        if pos.is_flat() {
            return Err(SimulationError::NoOpenPosition { bar_index: index });
        }
        let notional = pos.size * price;
        let exit_cost = self.costs.cost(notional);
        self.cash += pos.direction.sign() * notional - exit_cost;

        let gross_pnl = pos.direction.sign() * pos.size * (price - pos.entry_price);
        let costs = self.entry_cost + exit_cost;
        self.trades.push(TradeRecord {
            direction: pos.direction,
            entry_index: pos.entry_index,
            entry_time: self.entry_time.unwrap_or(bar.timestamp),
            entry_price: pos.entry_price,
            exit_index: index,
            exit_time: bar.timestamp,
            exit_price: price,
            size: pos.size,
            gross_pnl,
            costs,
            pnl: gross_pnl - costs,
            exit_reason: reason,
        });
        tracing::debug!(bar = index, %reason, price, pnl = gross_pnl - costs, "close");

        self.position = PositionState::flat();
        self.entry_time = None;
        self.entry_cost = 0.0;
        self.last_exit_index = Some(index);
        Ok(())
    }
}
