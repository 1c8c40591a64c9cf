//! Normal-distribution helpers for the reliability models.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

/// Standard normal CDF, Φ(x).
pub fn normal_cdf(x: f64) -> f64 {
    if x == f64::INFINITY {
        1.0
    } else if x == f64::NEG_INFINITY {
        0.0
    } else {
        0.5 * erfc(-x / SQRT_2)
    }
}

/// Probability that a normally distributed travel time with the given mean
/// and standard deviation arrives no later than `deadline`.
///
/// A zero (or negative) deviation makes the arrival deterministic.
///
/// # Examples
///
/// ```
/// use hyperpath::planner::on_time_probability;
///
/// assert_eq!(on_time_probability(10.0, 0.0, 15.0), 1.0);
/// assert_eq!(on_time_probability(15.0, 0.0, 10.0), 0.0);
///
/// let p = on_time_probability(15.0, 2.0, 10.0);
/// assert!(p > 0.0 && p < 1.0);
/// ```
pub fn on_time_probability(mean_time: f64, std_time: f64, deadline: f64) -> f64 {
    if !mean_time.is_finite() {
        return if mean_time < 0.0 { 1.0 } else { 0.0 };
    }
    if std_time <= 0.0 {
        return if mean_time <= deadline { 1.0 } else { 0.0 };
    }
    normal_cdf((deadline - mean_time) / std_time).clamp(0.0, 1.0)
}
