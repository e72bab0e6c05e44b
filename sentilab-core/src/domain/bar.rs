//! Bar: one time slice of price, volume and sentiment.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ids::DatasetHash;
use crate::error::{OhlcViolation, SchemaError};

/// OHLCV bar joined with the sentiment signal for the same interval.
///
/// `signal_level` is expected in 0–10 but only NaN is rejected at load time.
/// The PAD-derived dimensions are optional; strategies that need them treat
/// `None` as "condition not met".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub signal_level: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominance: Option<f64>,
}

impl Bar {
    /// Every OHLC relationship this bar breaks, tagged with `index`.
    pub fn ohlc_violations(&self, index: usize) -> Vec<OhlcViolation> {
        let checks = [
            (self.high < self.low, "high < low"),
            (self.high < self.close, "high < close"),
            (self.high < self.open, "high < open"),
            (self.low > self.close, "low > close"),
            (self.low > self.open, "low > open"),
            (self.close <= 0.0, "close <= 0"),
            (self.volume < 0.0, "volume < 0"),
        ];
        checks
            .into_iter()
            .filter(|(broken, _)| *broken)
            .map(|(_, reason)| OhlcViolation { index, reason })
            .collect()
    }

    pub fn is_sane(&self) -> bool {
        self.ohlc_violations(0).is_empty()
    }
}

/// Immutable, strictly time-ordered bar sequence.
///
/// Cloning is cheap: the bars live behind an `Arc` so the optimizer can hand
/// the same series to every worker.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    bars: Arc<[Bar]>,
}

impl BarSeries {
    /// Wrap `bars`, rejecting duplicate or decreasing timestamps.
    ///
    /// Row numbers in the error are positions in `bars`.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SchemaError> {
        if let Some(err) = first_order_violation(&bars) {
            return Err(err);
        }
        Ok(Self { bars: bars.into() })
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// `(min, max)` of the signal level, `None` when empty.
    pub fn signal_range(&self) -> Option<(f64, f64)> {
        self.bars.iter().map(|b| b.signal_level).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Content hash over every field of every bar.
    pub fn dataset_hash(&self) -> DatasetHash {
        let mut hasher = blake3::Hasher::new();
        for bar in self.bars.iter() {
            hasher.update(&bar.timestamp.and_utc().timestamp_micros().to_le_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close, bar.volume, bar.signal_level] {
                hasher.update(&v.to_le_bytes());
            }
            for extra in [bar.polarity, bar.intensity, bar.dominance] {
                match extra {
                    Some(v) => hasher.update(&v.to_le_bytes()),
                    None => hasher.update(&[0xff]),
                };
            }
        }
        DatasetHash(hasher.finalize().to_hex().to_string())
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

fn first_order_violation(bars: &[Bar]) -> Option<SchemaError> {
    bars.windows(2).enumerate().find_map(|(i, pair)| {
        let (prev, cur) = (pair[0].timestamp, pair[1].timestamp);
        if cur == prev {
            Some(SchemaError::DuplicateTimestamp {
                row: i + 1,
                timestamp: cur,
            })
        } else if cur < prev {
            Some(SchemaError::NonMonotonicTimestamp {
                row: i + 1,
                previous: prev,
                current: cur,
            })
        } else {
            None
        }
    })
}
