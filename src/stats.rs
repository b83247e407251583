//! Population statistics over a numeric series. Every function is defined
//! for the empty series.

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

pub fn population_variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = mean(series);
    series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / series.len() as f64
}

pub fn population_std_dev(series: &[f64]) -> f64 {
    population_variance(series).sqrt()
}

/// Both extremes in one pass, `None` for an empty series.
pub fn min_max(series: &[f64]) -> Option<(f64, f64)> {
    let (first, rest) = series.split_first()?;
    Some(rest.iter().fold((*first, *first), |(min, max), v| {
        (min.min(*v), max.max(*v))
    }))
}

pub fn count_greater_than(series: &[f64], x: f64) -> usize {
    series.iter().filter(|v| **v > x).count()
}

pub fn count_less_than(series: &[f64], x: f64) -> usize {
    series.iter().filter(|v| **v < x).count()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
