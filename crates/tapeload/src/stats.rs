//! Pulse width statistics

use std::collections::BTreeMap;

/// Running statistics for one class of pulse
///
/// Tracks the count, sum, sum of squares, extremes, and a
/// histogram of every duration folded in. The histogram is kept
/// sorted by duration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToneStatistics {
    count: u64,
    sum: u64,
    sum_sq: u64,
    min: Option<u32>,
    max: Option<u32>,
    histogram: BTreeMap<u32, u64>,
}

impl ToneStatistics {
    /// Empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all accumulated values
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold in one duration
    pub fn add(&mut self, duration: u32) {
        let d = duration as u64;
        self.count += 1;
        self.sum += d;
        self.sum_sq += d * d;
        self.min = Some(self.min.map_or(duration, |m| u32::min(m, duration)));
        self.max = Some(self.max.map_or(duration, |m| u32::max(m, duration)));
        *self.histogram.entry(duration).or_insert(0) += 1;
    }

    /// Number of durations folded in
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all durations
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Shortest duration, if any
    pub fn min(&self) -> Option<u32> {
        self.min
    }

    /// Longest duration, if any
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Number of occurrences of each duration, by duration
    pub fn histogram(&self) -> &BTreeMap<u32, u64> {
        &self.histogram
    }

    /// Mean duration, or zero if empty
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }

    /// Population variance, or zero if empty
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_sq as f64 / self.count as f64 - self.mean().powi(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_empty() {
        let st = ToneStatistics::new();
        assert_eq!(st.count(), 0);
        assert_eq!(st.mean(), 0.0);
        assert_eq!(st.variance(), 0.0);
        assert_eq!(st.min(), None);
        assert!(st.histogram().is_empty());
    }

    #[test]
    fn test_accumulate() {
        let mut st = ToneStatistics::new();
        for d in [8u32, 10, 8, 9, 8] {
            st.add(d);
        }

        assert_eq!(st.count(), 5);
        assert_eq!(st.sum(), 43);
        assert_eq!(st.min(), Some(8));
        assert_eq!(st.max(), Some(10));
        assert_approx_eq!(st.mean(), 8.6);
        assert_approx_eq!(st.variance(), 0.64);

        let hist: Vec<(u32, u64)> = st.histogram().iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(hist, vec![(8, 3), (9, 1), (10, 1)]);

        st.reset();
        assert_eq!(st, ToneStatistics::default());
    }
}
