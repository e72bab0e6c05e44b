//! Fitness function: configurable objective for ranking runs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceMetrics;

/// Which metric to optimize/sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    #[default]
    TotalReturn,
    AnnualizedReturn,
    Sharpe,
    Sortino,
    WinRate,
    ProfitFactor,
    MaxDrawdown,
}

impl FitnessMetric {
    pub const ALL: [FitnessMetric; 7] = [
        Self::TotalReturn,
        Self::AnnualizedReturn,
        Self::Sharpe,
        Self::Sortino,
        Self::WinRate,
        Self::ProfitFactor,
        Self::MaxDrawdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TotalReturn => "total_return",
            Self::AnnualizedReturn => "annualized_return",
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::MaxDrawdown => "max_drawdown",
        }
    }

    /// Extract the relevant metric value from a PerformanceMetrics struct.
    pub fn extract(&self, metrics: &PerformanceMetrics) -> f64 {
        match self {
            Self::TotalReturn => metrics.total_return,
            Self::AnnualizedReturn => metrics.annualized_return,
            Self::Sharpe => metrics.sharpe,
            Self::Sortino => metrics.sortino,
            Self::WinRate => metrics.win_rate,
            Self::ProfitFactor => metrics.profit_factor,
            Self::MaxDrawdown => metrics.max_drawdown,
        }
    }

    /// Returns true if `a` is better than `b`.
    ///
    /// Higher wins for every metric: drawdown is stored negative, so -0.05
    /// beats -0.20.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

impl fmt::Display for FitnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown objective `{s}` (expected one of: {})", known.join(", "))
            })
    }
}
