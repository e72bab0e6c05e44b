//! Strategy configuration: strategy kind, trading mode, exit order and a numeric parameter map.
//!
//! Parameters are a `BTreeMap<String, f64>` so configs hash and serialize
//! deterministically. Booleans are encoded as `0`/`1`. Each strategy turns the
//! map into its own typed, validated config at construction; unknown names
//! are rejected rather than ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::{FullHash, TradingMode};
use crate::error::ConfigError;

/// The closed set of strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Signal-level mean reversion.
    #[serde(rename = "original", alias = "signal_level")]
    SignalLevel,
    Extreme,
    Momentum,
    Layered,
    BollingerBands,
    TurtleTrading,
    SignalLevelReverse,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        Self::SignalLevel,
        Self::Extreme,
        Self::Momentum,
        Self::Layered,
        Self::BollingerBands,
        Self::TurtleTrading,
        Self::SignalLevelReverse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignalLevel => "original",
            Self::Extreme => "extreme",
            Self::Momentum => "momentum",
            Self::Layered => "layered",
            Self::BollingerBands => "bollinger_bands",
            Self::TurtleTrading => "turtle_trading",
            Self::SignalLevelReverse => "signal_level_reverse",
        }
    }

    /// Whether decisions depend on the sentiment columns at all.
    pub fn uses_sentiment(self) -> bool {
        !matches!(self, Self::BollingerBands | Self::TurtleTrading)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" | "signal_level" => Ok(Self::SignalLevel),
            "extreme" => Ok(Self::Extreme),
            "momentum" => Ok(Self::Momentum),
            "layered" => Ok(Self::Layered),
            "bollinger_bands" | "bollinger" => Ok(Self::BollingerBands),
            "turtle_trading" | "turtle" => Ok(Self::TurtleTrading),
            "signal_level_reverse" => Ok(Self::SignalLevelReverse),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// One forced or signal-driven exit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    StopLoss,
    TakeProfit,
    MaxHolding,
    Signal,
}

/// stop-loss > take-profit > max-holding > strategy signal.
pub fn default_exit_order() -> Vec<ExitRule> {
    vec![
        ExitRule::StopLoss,
        ExitRule::TakeProfit,
        ExitRule::MaxHolding,
        ExitRule::Signal,
    ]
}

/// Complete, serializable description of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    #[serde(default)]
    pub trading_mode: TradingMode,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default = "default_exit_order")]
    pub exit_order: Vec<ExitRule>,
}

impl StrategyConfig {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            trading_mode: TradingMode::default(),
            params: BTreeMap::new(),
            exit_order: default_exit_order(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_trading_mode(mut self, mode: TradingMode) -> Self {
        self.trading_mode = mode;
        self
    }

    pub fn with_exit_order(mut self, order: Vec<ExitRule>) -> Self {
        self.exit_order = order;
        self
    }

    /// Copy of this config with `overrides` layered over the parameter map.
    pub fn overridden(&self, overrides: &BTreeMap<String, f64>) -> Self {
        let mut next = self.clone();
        for (name, value) in overrides {
            next.params.insert(name.clone(), *value);
        }
        next
    }

    /// Exact identity: kind, mode, exit order and every parameter value.
    ///
    /// Floats are written with `{:?}`, which round-trips, so equal configs
    /// always hash equal and any parameter change moves the hash.
    pub fn full_hash(&self) -> FullHash {
        let mut canonical = format!(
            "{}|{:?}|{:?}",
            self.kind, self.trading_mode, self.exit_order
        );
        for (name, value) in &self.params {
            canonical.push_str(&format!("|{name}={value:?}"));
        }
        FullHash::from_bytes(canonical.as_bytes())
    }
}

// ─── Parameter access ───────────────────────────────────────────────

/// Reject any parameter not named in one of `accepted`.
pub(crate) fn ensure_known_params(
    config: &StrategyConfig,
    accepted: &[&[&str]],
) -> Result<(), ConfigError> {
    for name in config.params.keys() {
        let known = accepted.iter().any(|group| group.contains(&name.as_str()));
        if !known {
            return Err(ConfigError::UnknownParam {
                strategy: config.kind.to_string(),
                param: name.clone(),
            });
        }
    }
    Ok(())
}

/// Typed, validating view over a parameter map.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    values: &'a BTreeMap<String, f64>,
}

impl<'a> Params<'a> {
    pub fn new(values: &'a BTreeMap<String, f64>) -> Self {
        Self { values }
    }

    pub fn f64(&self, name: &str, default: f64) -> Result<f64, ConfigError> {
        let value = self.values.get(name).copied().unwrap_or(default);
        if !value.is_finite() {
            return Err(invalid(name, value, "must be finite"));
        }
        Ok(value)
    }

    /// Non-negative whole number.
    pub fn usize(&self, name: &str, default: usize) -> Result<usize, ConfigError> {
        let Some(value) = self.values.get(name).copied() else {
            return Ok(default);
        };
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(invalid(name, value, "must be a non-negative whole number"));
        }
        Ok(value as usize)
    }

    /// `0` or `1`.
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, ConfigError> {
        match self.values.get(name).copied() {
            None => Ok(default),
            Some(v) if v == 0.0 => Ok(false),
            Some(v) if v == 1.0 => Ok(true),
            Some(v) => Err(invalid(name, v, "must be 0 or 1")),
        }
    }
}

pub(crate) fn invalid(param: &str, value: f64, reason: &'static str) -> ConfigError {
    ConfigError::InvalidParam {
        param: param.to_string(),
        value,
        reason,
    }
}

pub(crate) fn inconsistent(kind: StrategyKind, detail: String) -> ConfigError {
    ConfigError::Inconsistent {
        strategy: kind.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StrategyConfig {
        StrategyConfig::new(StrategyKind::Extreme)
            .with_param("low_threshold", 2.5)
            .with_param("high_threshold", 7.5)
    }

    #[test]
    fn kind_parses_cli_names() {
        assert_eq!("original".parse::<StrategyKind>().unwrap(), StrategyKind::SignalLevel);
        assert_eq!("signal_level".parse::<StrategyKind>().unwrap(), StrategyKind::SignalLevel);
        assert_eq!(
            "Turtle_Trading".parse::<StrategyKind>().unwrap(),
            StrategyKind::TurtleTrading
        );
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let err = "martingale".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownStrategy("martingale".into()));
    }

    #[test]
    fn full_hash_deterministic_and_param_sensitive() {
        assert_eq!(sample().full_hash(), sample().full_hash());
        let moved = sample().with_param("low_threshold", 2.0);
        assert_ne!(sample().full_hash(), moved.full_hash());
        let mode = sample().with_trading_mode(TradingMode::LongOnly);
        assert_ne!(sample().full_hash(), mode.full_hash());
    }

    #[test]
    fn overridden_keeps_base_params() {
        let mut overrides = BTreeMap::new();
        overrides.insert("stop_loss".to_string(), 0.02);
        overrides.insert("low_threshold".to_string(), 2.0);
        let next = sample().overridden(&overrides);
        assert_eq!(next.params["low_threshold"], 2.0);
        assert_eq!(next.params["high_threshold"], 7.5);
        assert_eq!(next.params["stop_loss"], 0.02);
    }

    #[test]
    fn params_reader_validates_types() {
        let mut map = BTreeMap::new();
        map.insert("period".to_string(), 2.5);
        map.insert("toggle".to_string(), 2.0);
        map.insert("ratio".to_string(), f64::NAN);
        let p = Params::new(&map);
        assert!(p.usize("period", 1).is_err());
        assert!(p.flag("toggle", false).is_err());
        assert!(p.f64("ratio", 0.0).is_err());
        assert_eq!(p.usize("missing", 7).unwrap(), 7);
        assert!(!p.flag("missing", false).unwrap());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = sample();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"extreme\""));
        let back: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let back: StrategyConfig = serde_json::from_str(r#"{"kind":"original"}"#).unwrap();
        assert_eq!(back.kind, StrategyKind::SignalLevel);
        assert_eq!(back.trading_mode, TradingMode::LongShort);
        assert_eq!(back.exit_order, default_exit_order());
        assert!(back.params.is_empty());
    }
}
