//! Run metadata encoded in the input file name.
//!
//! `<instrument>_with_emotion_<granularity>_lag<minutes>min.<ext>`, e.g.
//! `IF_with_emotion_1min_lag5min.csv`. Only the `_<granularity>_lag<N>min`
//! tail is required; the instrument is whatever precedes it.

use std::path::Path;

use serde::{Deserialize, Serialize};

const EMOTION_INFIX: &str = "_with_emotion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub instrument: Option<String>,
    pub granularity: String,
    pub lag_minutes: u32,
}

impl DatasetMeta {
    /// Parse the file stem; `None` (with a warning) when the tail is absent.
    pub fn from_path(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let meta = Self::parse_stem(stem);
        if meta.is_none() {
            tracing::warn!(file = stem, "file name carries no granularity/lag metadata");
        }
        meta
    }

    pub fn parse_stem(stem: &str) -> Option<Self> {
        let lag_at = stem.rfind("_lag")?;
        let lag_minutes = stem[lag_at + 4..].strip_suffix("min")?.parse().ok()?;

        let head = &stem[..lag_at];
        let split = head.rfind('_')?;
        let granularity = &head[split + 1..];
        if granularity.is_empty() || !granularity.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        let prefix = &head[..split];
        let instrument = prefix.strip_suffix(EMOTION_INFIX).unwrap_or(prefix);
        Some(Self {
            instrument: (!instrument.is_empty()).then(|| instrument.to_string()),
            granularity: granularity.to_string(),
            lag_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_convention() {
        let meta = DatasetMeta::from_path(Path::new("data/IF_with_emotion_1min_lag5min.xlsx")).unwrap();
        assert_eq!(meta.instrument.as_deref(), Some("IF"));
        assert_eq!(meta.granularity, "1min");
        assert_eq!(meta.lag_minutes, 5);
    }

    #[test]
    fn instrument_is_optional() {
        let meta = DatasetMeta::parse_stem("_5min_lag15min").unwrap();
        assert_eq!(meta.instrument, None);
        assert_eq!(meta.granularity, "5min");
        assert_eq!(meta.lag_minutes, 15);
    }

    #[test]
    fn unrelated_names_yield_none() {
        assert_eq!(DatasetMeta::parse_stem("bars"), None);
        assert_eq!(DatasetMeta::parse_stem("IF_1min_lagXmin"), None);
        assert_eq!(DatasetMeta::parse_stem("IF_1min_lag5"), None);
        assert!(DatasetMeta::from_path(Path::new("plain.csv")).is_none());
    }
}
