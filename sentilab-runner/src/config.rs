//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [data]
//! path = "data/IF_with_emotion_1min_lag5min.csv"
//! [data.columns]
//! signal_level = "sentiment"
//!
//! [backtest]
//! initial_cash = 100000
//! commission_rate = 0.001
//! output_dir = "results"
//!
//! [strategy]
//! name = "extreme"            # or "all"
//! trading_mode = "long_only"
//! [strategy.params]
//! stop_loss = 0.02
//!
//! [optimize]
//! objective = "sharpe"
//! [optimize.grid]
//! stop_loss = [0.01, 0.02]
//! ```
//!
//! Every section is optional. Strategy runs start from the catalog defaults
//! and layer `[strategy.params]` on top.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sentilab_core::config::{default_exit_order, ExitRule};
use sentilab_core::data::{ColumnMapping, SyntheticSpec};
use sentilab_core::domain::TradingMode;
use sentilab_core::engine::{CostModel, RunSettings};
use sentilab_core::{ConfigError, StrategyConfig, StrategyKind};

use crate::catalog;
use crate::fitness::FitnessMetric;
use crate::optimizer::ParamGrid;

/// Top-level run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub data: DataSection,
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    pub optimize: OptimizeSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataSection {
    pub path: Option<PathBuf>,
    /// Generate a seeded synthetic series instead of reading a file.
    pub synthetic: Option<SyntheticSection>,
    /// Field name -> column name overrides for the alias table.
    pub columns: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticSection {
    pub bars: usize,
    pub seed: u64,
}

impl Default for SyntheticSection {
    fn default() -> Self {
        let spec = SyntheticSpec::default();
        Self {
            bars: spec.bars,
            seed: spec.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BacktestSection {
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Per-run wall-clock guard in milliseconds.
    pub time_budget_ms: Option<u64>,
    pub output_dir: PathBuf,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            time_budget_ms: None,
            output_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategySection {
    /// A strategy name, or `all`.
    pub name: String,
    pub trading_mode: Option<TradingMode>,
    pub exit_order: Option<Vec<ExitRule>>,
    pub params: BTreeMap<String, f64>,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            name: StrategyKind::SignalLevel.as_str().to_string(),
            trading_mode: None,
            exit_order: None,
            params: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizeSection {
    pub objective: FitnessMetric,
    pub parallel: bool,
    /// Empty means the catalog's default grid.
    pub grid: BTreeMap<String, Vec<f64>>,
}

impl Default for OptimizeSection {
    fn default() -> Self {
        Self {
            objective: FitnessMetric::default(),
            parallel: true,
            grid: BTreeMap::new(),
        }
    }
}

/// Which strategies a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySelection {
    One(StrategyKind),
    All,
}

impl StrategySelection {
    pub fn kinds(self) -> Vec<StrategyKind> {
        match self {
            Self::One(kind) => vec![kind],
            Self::All => StrategyKind::ALL.to_vec(),
        }
    }
}

impl FromStr for StrategySelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::One)
    }
}

impl fmt::Display for StrategySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(kind) => write!(f, "{kind}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    File(PathBuf),
    Synthetic(SyntheticSpec),
}

impl RunConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse run config TOML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serialize run config")
    }

    pub fn selection(&self) -> Result<StrategySelection, ConfigError> {
        self.strategy.name.parse()
    }

    /// Synthetic data wins when both a path and a synthetic section are set.
    pub fn data_source(&self) -> Result<DataSource, ConfigError> {
        if let Some(synthetic) = &self.data.synthetic {
            return Ok(DataSource::Synthetic(SyntheticSpec::new(
                synthetic.bars,
                synthetic.seed,
            )));
        }
        self.data
            .path
            .clone()
            .map(DataSource::File)
            .ok_or_else(|| ConfigError::InvalidSettings("no data path or synthetic data given".into()))
    }

    pub fn column_mapping(&self) -> Result<ColumnMapping, ConfigError> {
        ColumnMapping::from_names(
            self.data
                .columns
                .iter()
                .map(|(field, column)| (field.as_str(), column.as_str())),
        )
    }

    pub fn run_settings(&self) -> RunSettings {
        let b = &self.backtest;
        let settings = RunSettings::new(b.initial_cash)
            .with_costs(CostModel::new(b.commission_rate, b.slippage_rate));
        match b.time_budget_ms {
            Some(ms) => settings.with_time_budget(Duration::from_millis(ms)),
            None => settings,
        }
    }

    /// Catalog defaults for `kind`, overlaid with the configured mode, exit
    /// order and parameters.
    ///
    /// With `name = "all"` the parameter overrides are skipped.
    pub fn strategy_config(&self, kind: StrategyKind) -> Result<StrategyConfig, ConfigError> {
        let mut config = catalog::profile(kind).default_config();
        if let Some(mode) = self.strategy.trading_mode {
            config = config.with_trading_mode(mode);
        }
        config = config.with_exit_order(
            self.strategy
                .exit_order
                .clone()
                .unwrap_or_else(default_exit_order),
        );
        if self.selection()? != StrategySelection::All {
            config = config.overridden(&self.strategy.params);
        }
        Ok(config)
    }

    /// The configured grid, or the catalog grid for `kind` when none is set
    /// or when every strategy is selected.
    pub fn grid(&self, kind: StrategyKind) -> ParamGrid {
        if self.optimize.grid.is_empty() || self.strategy.name.trim().eq_ignore_ascii_case("all") {
            catalog::profile(kind).default_grid()
        } else {
            ParamGrid::from_axes(self.optimize.grid.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentilab_core::data::Field;

    const SAMPLE: &str = r#"
        [data]
        path = "data/IF_with_emotion_1min_lag5min.csv"
        [data.columns]
        signal_level = "sentiment"

        [backtest]
        initial_cash = 50000
        commission_rate = 0.001
        slippage_rate = 0.001
        time_budget_ms = 2000
        output_dir = "out"

        [strategy]
        name = "extreme"
        trading_mode = "long_only"
        exit_order = ["signal", "stop_loss", "take_profit", "max_holding"]
        [strategy.params]
        stop_loss = 0.03

        [optimize]
        objective = "sharpe"
        parallel = false
        [optimize.grid]
        stop_loss = [0.02, 0.01]
        take_profit = [0.02, 0.04]
    "#;

    #[test]
    fn parses_every_section() {
        let config = RunConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(
            config.data_source().unwrap(),
            DataSource::File(PathBuf::from("data/IF_with_emotion_1min_lag5min.csv"))
        );
        assert_eq!(
            config.column_mapping().unwrap().get(Field::SignalLevel),
            Some("sentiment")
        );

        let settings = config.run_settings();
        assert_eq!(settings.initial_cash, 50_000.0);
        assert_eq!(settings.costs, CostModel::new(0.001, 0.001));
        assert_eq!(settings.time_budget, Some(Duration::from_millis(2000)));

        assert_eq!(
            config.selection().unwrap(),
            StrategySelection::One(StrategyKind::Extreme)
        );
        let strategy = config.strategy_config(StrategyKind::Extreme).unwrap();
        assert_eq!(strategy.trading_mode, TradingMode::LongOnly);
        assert_eq!(strategy.params["stop_loss"], 0.03);
        assert_eq!(strategy.params["low_threshold"], 2.5);
        assert_eq!(strategy.exit_order[0], ExitRule::Signal);

        assert_eq!(config.optimize.objective, FitnessMetric::Sharpe);
        let grid = config.grid(StrategyKind::Extreme);
        assert_eq!(grid.size(), 4);
        assert_eq!(grid.axes()["stop_loss"], vec![0.01, 0.02]);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = RunConfig::from_toml("").unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(
            config.selection().unwrap(),
            StrategySelection::One(StrategyKind::SignalLevel)
        );
        assert!(config.data_source().is_err());
        assert_eq!(config.grid(StrategyKind::SignalLevel).size(), 81);
    }

    #[test]
    fn all_skips_parameter_overrides() {
        let config = RunConfig::from_toml(
            "[strategy]\nname = \"all\"\n[strategy.params]\nbb_period = 30\n",
        )
        .unwrap();
        assert_eq!(config.selection().unwrap(), StrategySelection::All);
        let extreme = config.strategy_config(StrategyKind::Extreme).unwrap();
        assert!(!extreme.params.contains_key("bb_period"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(RunConfig::from_toml("[backtest]\ninitial_capital = 1\n").is_err());
    }

    #[test]
    fn unknown_column_field_is_config_error() {
        let config = RunConfig::from_toml("[data.columns]\nsentiment = \"x\"\n").unwrap();
        assert!(config.column_mapping().is_err());
    }

    #[test]
    fn synthetic_source() {
        let config = RunConfig::from_toml("[data.synthetic]\nbars = 500\nseed = 3\n").unwrap();
        match config.data_source().unwrap() {
            DataSource::Synthetic(spec) => assert_eq!((spec.bars, spec.seed), (500, 3)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn toml_roundtrip() {
        let config = RunConfig::from_toml(SAMPLE).unwrap();
        let back = RunConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, back);
    }
}
