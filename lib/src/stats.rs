//! Small numeric helpers shared by the aggregation, smoothing and
//! standardization steps.

use crate::config::Winsor;

/// Spread below this fraction of the mean's magnitude is rounding noise.
pub const STD_RELATIVE_EPSILON: f64 = 1e-12;

/// Quantile of an ascending slice with linear interpolation between the two
/// nearest ranks. Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Lower and upper clip bounds of the finite values, or `None` if there are none.
pub fn winsor_bounds<'a, I>(values: I, winsor: Winsor) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    Some((
        quantile(&sorted, winsor.lower)?,
        quantile(&sorted, winsor.upper)?,
    ))
}

/// Clips every finite value to the slice's own percentile bounds.
pub fn winsorize(values: &mut [f64], winsor: Winsor) {
    if let Some((lo, hi)) = winsor_bounds(values.iter(), winsor) {
        for v in values.iter_mut().filter(|v| v.is_finite()) {
            *v = v.clamp(lo, hi);
        }
    }
}

/// Like [`winsorize`], leaving missing entries missing.
pub fn winsorize_present(values: &mut [Option<f64>], winsor: Winsor) {
    if let Some((lo, hi)) = winsor_bounds(values.iter().flatten(), winsor) {
        for v in values.iter_mut().flatten() {
            *v = v.clamp(lo, hi);
        }
    }
}

/// Mean and population standard deviation of a pool of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub std: f64,
}

impl PoolStats {
    /// `None` when the pool has no finite values.
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(PoolStats {
            mean,
            std: variance.sqrt(),
        })
    }

    /// Z-score of `value`; 0 when the pool has no spread.
    ///
    /// The spread test is relative to the mean, so pools of tiny values
    /// standardize the same as their rescaled copies.
    pub fn zscore(&self, value: f64) -> f64 {
        if !self.std.is_finite() || self.std <= STD_RELATIVE_EPSILON * self.mean.abs() {
            return 0.0;
        }
        (value - self.mean) / self.std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert!((quantile(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn winsorize_clips_only_the_tails() {
        let mut values: Vec<f64> = (0..=100).map(f64::from).collect();
        values[100] = 10_000.0;
        winsorize(&mut values, Winsor::default());
        assert_eq!(values[50], 50.0);
        assert_eq!(values[0], 1.0);
        assert!(values[100] < 10_000.0);
    }

    #[test]
    fn winsorize_present_keeps_gaps() {
        let mut values = vec![Some(1.0), None, Some(3.0)];
        winsorize_present(&mut values, Winsor { lower: 0.0, upper: 1.0 });
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn pool_stats_use_population_std() {
        let stats = PoolStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std, 2.0);
        assert_eq!(stats.zscore(9.0), 2.0);
    }

    #[test]
    fn zero_spread_pool_scores_zero() {
        let stats = PoolStats::from_values([3.0, 3.0]).unwrap();
        assert_eq!(stats.zscore(100.0), 0.0);
        assert!(PoolStats::from_values([f64::NAN]).is_none());
        // Rounding noise around a constant pool is still no spread.
        let stats = PoolStats::from_values([0.1, 0.1, 0.1]).unwrap();
        assert_eq!(stats.zscore(0.1), 0.0);
    }

    #[test]
    fn tiny_scale_pools_keep_their_scores() {
        let raw = [2.0, -1.5, 7.0, 0.25];
        let scaled: Vec<f64> = raw.iter().map(|v| v * 1e-13).collect();
        let stats = PoolStats::from_values(raw).unwrap();
        let tiny = PoolStats::from_values(scaled.iter().copied()).unwrap();
        for (v, t) in raw.iter().zip(&scaled) {
            let expected = stats.zscore(*v);
            assert!(expected.abs() > 1e-3);
            assert!((tiny.zscore(*t) - expected).abs() < 1e-9);
        }
    }
}
