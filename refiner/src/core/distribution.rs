//! Empirical cumulative distributions

use serde::{Deserialize, Serialize};

/// One point of an empirical CDF
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CdfPoint {
    pub value: f64,
    pub cumulative: f64,
}

/// Map every score of an ascending sequence to the fraction of scores `<=` it
///
/// Tied scores all receive the fraction of their last occurrence, so the
/// output is non-decreasing and ends at 1. An empty input yields an empty
/// output.
pub fn cdf(sorted_scores: &[f64]) -> Vec<f64> {
    let n = sorted_scores.len() as f64;
    sorted_scores
        .iter()
        .map(|score| sorted_scores.partition_point(|s| s <= score) as f64 / n)
        .collect()
}

/// Sort a copy of `values` ascending; NaN sorts last
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Pair each value of `values` with its cumulative fraction
pub fn cdf_points(values: &[f64]) -> Vec<CdfPoint> {
    let sorted = sorted(values);
    cdf(&sorted)
        .into_iter()
        .zip(sorted)
        .map(|(cumulative, value)| CdfPoint { value, cumulative })
        .collect()
}

/// Fraction of `sorted_sample` that is `<= x`
pub fn ecdf_at(sorted_sample: &[f64], x: f64) -> f64 {
    if sorted_sample.is_empty() {
        return 0.0;
    }
    sorted_sample.partition_point(|s| *s <= x) as f64 / sorted_sample.len() as f64
}

/// Two-sample Kolmogorov-Smirnov statistic of two ascending samples
///
/// The supremum of the ECDF difference is attained at one of the sample
/// points, so only those are evaluated. Returns 0 when either sample is empty.
pub fn ks_statistic(sorted_a: &[f64], sorted_b: &[f64]) -> f64 {
    if sorted_a.is_empty() || sorted_b.is_empty() {
        return 0.0;
    }
    sorted_a
        .iter()
        .chain(sorted_b)
        .map(|&x| (ecdf_at(sorted_a, x) - ecdf_at(sorted_b, x)).abs())
        .fold(0.0, f64::max)
}
