//! Pre-run OHLC validation.

use crate::domain::Bar;
use crate::error::DataIntegrityError;

/// Check every bar and report all offending indices at once.
pub fn check_ohlc(bars: &[Bar]) -> Result<(), DataIntegrityError> {
    let violations: Vec<_> = bars
        .iter()
        .enumerate()
        .flat_map(|(i, bar)| bar.ohlc_violations(i))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DataIntegrityError { violations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::bar;

    #[test]
    fn clean_bars_pass() {
        let bars: Vec<Bar> = (0..5).map(|i| bar(i, 100.0 + i as f64, 5.0)).collect();
        assert!(check_ohlc(&bars).is_ok());
    }

    #[test]
    fn reports_all_offending_indices() {
        let mut bars: Vec<Bar> = (0..6).map(|i| bar(i, 100.0, 5.0)).collect();
        bars[1].high = 90.0;
        bars[4].close = 120.0;
        let err = check_ohlc(&bars).unwrap_err();
        assert_eq!(err.indices(), vec![1, 4]);
        assert!(err
            .violations
            .iter()
            .any(|v| v.index == 4 && v.reason == "high < close"));
    }
}
