//! Finite-safe summary statistics over small sample sets

use statrs::statistics::Statistics;

/// Guard used wherever a mean ends up in a denominator
pub const EPSILON: f64 = 1e-6;

/// Arithmetic mean, 0 for an empty set
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population standard deviation (divides by n), 0 for fewer than two values
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Coefficient of variation, 0 when the mean is too small to divide by
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() < EPSILON {
        return 0.0;
    }
    population_std(values) / m
}

/// Largest value, 0 for an empty set
pub fn max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(0.0)
}

/// Consecutive differences
pub fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
