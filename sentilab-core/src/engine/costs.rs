//! Fixed-rate transaction costs.
//!
//! Commission and slippage are both fractions of traded notional, charged
//! on entry and again on exit. Fill prices stay at their reference level;
//! the friction is booked as cash so trade prices remain comparable with
//! stop and target levels.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Commission as a fraction of notional, per side.
    pub commission_rate: f64,
    /// Slippage as a fraction of notional, per side.
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            commission_rate,
            slippage_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_frictionless(&self) -> bool {
        self.commission_rate == 0.0 && self.slippage_rate == 0.0
    }

    /// Total friction for one side of a trade with the given notional.
    pub fn cost(&self, notional: f64) -> f64 {
        notional.abs() * (self.commission_rate + self.slippage_rate)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rate) in [
            ("commission_rate", self.commission_rate),
            ("slippage_rate", self.slippage_rate),
        ] {
            if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
                return Err(ConfigError::InvalidSettings(format!(
                    "{name} must be in [0, 1), got {rate}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frictionless_costs_nothing() {
        let model = CostModel::frictionless();
        assert!(model.is_frictionless());
        assert_eq!(model.cost(10_000.0), 0.0);
    }

    #[test]
    fn cost_scales_with_notional() {
        let model = CostModel::new(0.001, 0.001);
        assert!((model.cost(10_000.0) - 20.0).abs() < 1e-9);
        assert!((model.cost(-10_000.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_negative_or_whole_rates() {
        assert!(CostModel::new(-0.001, 0.0).validate().is_err());
        assert!(CostModel::new(0.0, 1.0).validate().is_err());
        assert!(CostModel::new(f64::NAN, 0.0).validate().is_err());
        assert!(CostModel::new(0.001, 0.0005).validate().is_ok());
    }
}
