//! Statistical Features Computation

use crate::FeatureError;

/// Statistics computed for a single channel of a window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStatistics {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Local extrema above twice the standard deviation
    pub peak_count: usize,
    /// Median value
    pub median: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Number of sign flips between adjacent readings
    pub zero_crossings: usize,
}

impl ChannelStatistics {
    /// Compute statistics from one channel's readings
    pub fn compute(values: &[f64]) -> Result<Self, FeatureError> {
        if values.is_empty() {
            return Err(FeatureError::MalformedWindow(
                "channel has no readings".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(FeatureError::MalformedWindow(
                "channel contains non-finite readings".to_string(),
            ));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = std_dev(values);

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        Ok(Self {
            mean,
            std_dev,
            peak_count: peaks_above(values, 2.0 * std_dev),
            median: median(values),
            min,
            max,
            zero_crossings: zero_crossings(values),
        })
    }

    /// Range of the channel (max - min)
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Population standard deviation (divides by N)
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (m2 / n).sqrt()
}

/// Median; averages the two middle values for even lengths
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Count adjacent pairs whose product is strictly negative.
///
/// A zero reading never takes part in a crossing on either side.
pub fn zero_crossings(values: &[f64]) -> usize {
    values.windows(2).filter(|w| w[0] * w[1] < 0.0).count()
}

/// Count interior local extrema whose value exceeds twice the
/// channel's standard deviation.
pub fn peak_count(values: &[f64]) -> usize {
    peaks_above(values, 2.0 * std_dev(values))
}

fn peaks_above(values: &[f64], threshold: f64) -> usize {
    values
        .windows(3)
        .filter(|w| w[1] > threshold && (w[1] - w[0]) * (w[2] - w[1]) < 0.0)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = ChannelStatistics::compute(&values).unwrap();
        assert!((stats.mean - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_std_dev_computation() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        // Population std dev of this set is exactly 2.0
        assert!((std_dev(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_crossings() {
        assert_eq!(zero_crossings(&[1.0, -2.0, 3.0, -4.0, 5.0]), 4);
    }

    #[test]
    fn test_zero_value_is_not_a_crossing() {
        assert_eq!(zero_crossings(&[1.0, 0.0, -1.0]), 0);
        assert_eq!(zero_crossings(&[0.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn test_peak_count() {
        assert_eq!(peak_count(&[0.0, 10.0, 0.0, 10.0, 0.0]), 2);
    }

    #[test]
    fn test_peak_count_ignores_small_extrema() {
        // Extrema exist but none exceed 2σ
        assert_eq!(peak_count(&[-2.0, -1.0, -2.0, -1.0, -2.0]), 0);
    }

    #[test]
    fn test_peak_count_threshold_is_absolute() {
        // 2σ ≈ 0.98; every interior extremum sits above it, troughs included
        assert_eq!(peak_count(&[1.0, 2.0, 1.0, 2.0, 1.0]), 3);
    }

    #[test]
    fn test_peak_count_short_channel() {
        assert_eq!(peak_count(&[5.0]), 0);
        assert_eq!(peak_count(&[5.0, 1.0]), 0);
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_min_max_and_range() {
        let stats = ChannelStatistics::compute(&[3.0, -1.0, 7.0]).unwrap();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 7.0);
        assert_eq!(stats.range(), 8.0);
    }

    #[test]
    fn test_empty_values() {
        let values: Vec<f64> = vec![];
        assert!(matches!(
            ChannelStatistics::compute(&values),
            Err(FeatureError::MalformedWindow(_))
        ));
    }

    #[test]
    fn test_non_finite_values() {
        assert!(ChannelStatistics::compute(&[1.0, f64::NAN]).is_err());
    }
}
