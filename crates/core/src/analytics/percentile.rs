//! Percentile rank of a new observation against a baseline of prior values.
//!
//! The normal CDF uses the Abramowitz & Stegun 7.1.26 rational approximation of
//! `erf` (absolute error below 1.5e-7) so results are reproducible across
//! platforms and match previously recorded expectations.

const A1: f64 = 0.254_829_592;
const A2: f64 = -0.284_496_736;
const A3: f64 = 1.421_413_741;
const A4: f64 = -1.453_152_027;
const A5: f64 = 1.061_405_429;
const P: f64 = 0.327_591_1;

/// Minimum number of baseline values needed for a sample variance.
const MIN_BASELINE: usize = 2;

/// Approximate error function.
#[must_use]
pub fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t) * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution `Φ(z)`.
#[must_use]
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Sample statistics over the baseline values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    pub count: usize,
    pub mean: f64,
    /// Unbiased sample variance (divides by `count - 1`).
    pub variance: f64,
    pub std_dev: f64,
}

impl BaselineStats {
    /// Computes mean and sample variance.
    ///
    /// Returns `None` with fewer than two values or when any value is not finite.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples(values: &[f64]) -> Option<Self> {
        if values.len() < MIN_BASELINE || values.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let count = values.len();
        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        let variance = sum_sq / (n - 1.0);

        Some(Self {
            count,
            mean,
            variance,
            std_dev: variance.sqrt(),
        })
    }

    /// Percentile (0..=100) of `value` under a normal fitted to this baseline.
    #[must_use]
    pub fn percentile_of(&self, value: f64) -> f64 {
        if self.std_dev == 0.0 {
            if value == self.mean {
                return 50.0;
            }
            return if value > self.mean { 100.0 } else { 0.0 };
        }

        let z = (value - self.mean) / self.std_dev;
        100.0 * standard_normal_cdf(z)
    }
}

/// Ranks a session's normalized performance against earlier sessions.
pub struct PercentileRanker;

impl PercentileRanker {
    /// Ranks `new_value` against `baseline`.
    ///
    /// Returns `None` ("not yet available") unless the baseline has at least two
    /// finite values and `new_value` is finite.
    #[must_use]
    pub fn rank(baseline: &[f64], new_value: f64) -> Option<f64> {
        if !new_value.is_finite() {
            return None;
        }
        let stats = BaselineStats::from_samples(baseline)?;
        Some(stats.percentile_of(new_value))
    }

    /// Ranks the last element of `history` against all earlier elements.
    ///
    /// Needs at least three values in total.
    #[must_use]
    pub fn rank_latest(history: &[f64]) -> Option<f64> {
        let (latest, baseline) = history.split_last()?;
        Self::rank(baseline, *latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn stats_use_sample_variance() {
        let stats = BaselineStats::from_samples(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(stats.mean, 20.0);
        assert_eq!(stats.variance, 100.0);
        assert_eq!(stats.std_dev, 10.0);
    }

    #[test]
    fn value_at_mean_ranks_at_fifty() {
        let pct = PercentileRanker::rank(&[10.0, 20.0, 30.0], 20.0).unwrap();
        assert!(approx(pct, 50.0), "{pct}");
    }

    #[test]
    fn one_sigma_above_matches_normal_table() {
        let pct = PercentileRanker::rank(&[10.0, 20.0, 30.0], 30.0).unwrap();
        assert!((pct - 84.134_47).abs() < 1e-4, "{pct}");
        let pct = PercentileRanker::rank(&[10.0, 20.0, 30.0], 10.0).unwrap();
        assert!((pct - 15.865_53).abs() < 1e-4, "{pct}");
    }

    #[test]
    fn zero_spread_baseline_uses_step_rule() {
        let baseline = [5.0, 5.0, 5.0];
        assert_eq!(PercentileRanker::rank(&baseline, 5.0), Some(50.0));
        assert_eq!(PercentileRanker::rank(&baseline, 6.0), Some(100.0));
        assert_eq!(PercentileRanker::rank(&baseline, 4.0), Some(0.0));
    }

    #[test]
    fn insufficient_data_yields_none() {
        assert_eq!(PercentileRanker::rank_latest(&[]), None);
        assert_eq!(PercentileRanker::rank_latest(&[1.0, 2.0]), None);
        assert_eq!(PercentileRanker::rank(&[1.0], 2.0), None);
    }

    #[test]
    fn rank_latest_uses_all_but_last_as_baseline() {
        let pct = PercentileRanker::rank_latest(&[10.0, 20.0, 30.0, 20.0]).unwrap();
        assert!(approx(pct, 50.0));
    }

    #[test]
    fn non_finite_values_yield_none() {
        assert_eq!(PercentileRanker::rank(&[1.0, 2.0], f64::NAN), None);
        assert_eq!(PercentileRanker::rank(&[1.0, f64::INFINITY], 2.0), None);
    }

    #[test]
    fn erf_is_odd_and_bounded() {
        for x in [0.1, 0.5, 1.0, 2.0, 3.5] {
            assert!(approx(erf(-x), -erf(x)));
            assert!(erf(x) <= 1.0);
        }
        // Known value erf(1) = 0.8427007929
        assert!((erf(1.0) - 0.842_700_792_9).abs() < 5e-7);
    }
}
