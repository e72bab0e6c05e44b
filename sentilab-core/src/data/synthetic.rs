//! Seeded synthetic price/sentiment series for demos, tests and benches.
//!
//! The signal level is a mean-reverting walk around 5 clipped to `[0, 10]`;
//! returns lean against the previous bar's signal so the sentiment strategies
//! have something to find. Same seed, same bars.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, BarSeries};
use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpec {
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDateTime,
    pub step: Duration,
    pub start_price: f64,
}

impl SyntheticSpec {
    pub fn new(bars: usize, seed: u64) -> Self {
        Self {
            bars,
            seed,
            ..Self::default()
        }
    }
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            bars: 2_000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap_or_default(),
            step: Duration::minutes(1),
            start_price: 4_000.0,
        }
    }
}

pub fn synthetic_bars(spec: &SyntheticSpec) -> Result<BarSeries, SchemaError> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut bars = Vec::with_capacity(spec.bars);
    let mut close = spec.start_price;
    let mut signal: f64 = 5.0;
    let mut timestamp = spec.start;

    for _ in 0..spec.bars {
        let drift = 0.0006 * (5.0 - signal) / 5.0;
        let ret = drift + rng.gen_range(-0.002..0.002);
        let open = close;
        close = (open * (1.0 + ret)).max(0.01);
        let wick = rng.gen_range(0.0..0.001);
        let high = open.max(close) * (1.0 + wick);
        let low = open.min(close) * (1.0 - wick);

        signal = (5.0 + 0.85 * (signal - 5.0) + rng.gen_range(-1.5..1.5)).clamp(0.0, 10.0);
        let spike = if rng.gen_bool(0.05) { 3.0 } else { 1.0 };
        let volume = (1_000.0 + rng.gen_range(0.0..2_000.0)) * spike;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            signal_level: signal,
            polarity: Some((signal - 5.0) * 6.0 + rng.gen_range(-5.0..5.0)),
            intensity: Some(rng.gen_range(0.0..30.0)),
            dominance: Some(rng.gen_range(-6.0..6.0)),
        });
        timestamp += spec.step;
    }
    BarSeries::new(bars)
}
