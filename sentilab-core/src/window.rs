//! Bounded lookback buffer refreshed by bar index.
//!
//! Each strategy owns one window per series it needs (closes, highs, signal
//! levels...). `observe` is keyed by bar index and ignores an index it has
//! already seen, so calling a strategy twice for the same bar cannot shift
//! its history.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    last_index: Option<usize>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
            last_index: None,
        }
    }

    /// Record `value` for bar `index`. Returns false if `index` was already observed.
    pub fn observe(&mut self, index: usize, value: f64) -> bool {
        if matches!(self.last_index, Some(last) if index <= last) {
            return false;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.last_index = Some(index);
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Value observed `k` bars before the latest; `lag(0)` is the latest.
    pub fn lag(&self, k: usize) -> Option<f64> {
        let n = self.values.len();
        if k >= n {
            return None;
        }
        self.values.get(n - 1 - k).copied()
    }

    /// The last `n` values, latest included.
    fn recent(&self, n: usize) -> Option<impl Iterator<Item = f64> + '_> {
        let len = self.values.len();
        if n == 0 || n > len {
            return None;
        }
        Some(self.values.iter().skip(len - n).copied())
    }

    /// The `n` values before the latest.
    fn preceding(&self, n: usize) -> Option<impl Iterator<Item = f64> + '_> {
        let len = self.values.len();
        if n == 0 || n + 1 > len {
            return None;
        }
        Some(self.values.iter().skip(len - 1 - n).take(n).copied())
    }

    /// Mean of the last `n` values.
    pub fn mean(&self, n: usize) -> Option<f64> {
        self.recent(n).map(|it| it.sum::<f64>() / n as f64)
    }

    /// Population standard deviation of the last `n` values.
    pub fn std_dev(&self, n: usize) -> Option<f64> {
        let mean = self.mean(n)?;
        let var = self.recent(n)?.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        Some(var.sqrt())
    }

    /// Highest of the `n` values before the latest.
    pub fn max_preceding(&self, n: usize) -> Option<f64> {
        self.preceding(n).map(|it| it.fold(f64::NEG_INFINITY, f64::max))
    }

    /// Lowest of the `n` values before the latest.
    pub fn min_preceding(&self, n: usize) -> Option<f64> {
        self.preceding(n).map(|it| it.fold(f64::INFINITY, f64::min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[f64], capacity: usize) -> RollingWindow {
        let mut w = RollingWindow::new(capacity);
        for (i, v) in values.iter().enumerate() {
            w.observe(i, *v);
        }
        w
    }

    #[test]
    fn keeps_only_capacity_values() {
        let w = filled(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(w.len(), 3);
        assert_eq!(w.latest(), Some(5.0));
        assert_eq!(w.lag(2), Some(3.0));
        assert_eq!(w.lag(3), None);
    }

    #[test]
    fn repeated_index_is_ignored() {
        let mut w = RollingWindow::new(4);
        assert!(w.observe(0, 1.0));
        assert!(w.observe(1, 2.0));
        assert!(!w.observe(1, 99.0));
        assert!(!w.observe(0, 99.0));
        assert_eq!(w.len(), 2);
        assert_eq!(w.latest(), Some(2.0));
        assert_eq!(w.last_index(), Some(1));
    }

    #[test]
    fn mean_and_population_std() {
        let w = filled(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert!((w.mean(8).unwrap() - 5.0).abs() < 1e-12);
        assert!((w.std_dev(8).unwrap() - 2.0).abs() < 1e-12);
        assert!((w.mean(2).unwrap() - 8.0).abs() < 1e-12);
        assert!(w.mean(9).is_none());
        assert!(w.mean(0).is_none());
    }

    #[test]
    fn preceding_excludes_latest() {
        let w = filled(&[10.0, 30.0, 20.0, 50.0], 4);
        assert_eq!(w.max_preceding(3), Some(30.0));
        assert_eq!(w.min_preceding(2), Some(20.0));
        assert_eq!(w.max_preceding(4), None);
    }
}
