use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{
    AnomalyPattern, AnomalyPoint, ComparisonExtremes, ComparisonPattern, CorrelationPattern,
    Dataset, DistributionPattern, HistogramBin, PatternReport, Patterns, ThresholdPattern,
    ThresholdPoint, ThresholdSplit, TrendPattern,
};
use crate::stats;

const ANOMALY_SIGMA: f64 = 2.0;

/// Where a value sits relative to the extremes of its series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Extreme {
    Highest,
    Lowest,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Upward,
    Downward,
    Stable,
}

impl TrendDirection {
    pub fn of(series: &[f64]) -> Self {
        match (series.first(), series.last()) {
            (Some(first), Some(last)) if last > first => TrendDirection::Upward,
            (Some(first), Some(last)) if last < first => TrendDirection::Downward,
            _ => TrendDirection::Stable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Upward => "upward",
            TrendDirection::Downward => "downward",
            TrendDirection::Stable => "stable",
        }
    }
}

fn bin_width(min: f64, max: f64, bin_count: usize) -> f64 {
    let width = (max - min) / bin_count as f64;
    if width == 0.0 {
        1.0
    } else {
        width
    }
}

fn bin_index(value: f64, min: f64, width: f64, bin_count: usize) -> usize {
    let raw = ((value - min) / width).floor().max(0.0) as usize;
    raw.min(bin_count - 1)
}

pub fn histogram(series: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    let Some((min, max)) = stats::min_max(series) else {
        return Vec::new();
    };
    let bin_count = bin_count.max(1);
    let width = bin_width(min, max, bin_count);

    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| {
            let range_low = min + i as f64 * width;
            let range_high = min + (i + 1) as f64 * width;
            HistogramBin {
                range_low,
                range_high,
                label: format!("{range_low:.1}–{range_high:.1}"),
                count: 0,
            }
        })
        .collect();

    for value in series {
        bins[bin_index(*value, min, width, bin_count)].count += 1;
    }

    bins
}

/// Index of the bin of `histogram(series, bin_count)` that `value` falls in.
pub fn locate_bin(series: &[f64], bin_count: usize, value: f64) -> Option<usize> {
    let (min, max) = stats::min_max(series)?;
    let bin_count = bin_count.max(1);
    Some(bin_index(value, min, bin_width(min, max, bin_count), bin_count))
}

pub fn flag_anomalies(series: &[f64]) -> Vec<AnomalyPoint> {
    let mean = stats::mean(series);
    let spread = ANOMALY_SIGMA * stats::population_std_dev(series);

    series
        .iter()
        .map(|value| AnomalyPoint {
            value: *value,
            is_anomaly: *value > mean + spread || *value < mean - spread,
        })
        .collect()
}

pub fn threshold_split(series: &[f64]) -> ThresholdSplit {
    let threshold = stats::mean(series);
    let points: Vec<ThresholdPoint> = series
        .iter()
        .map(|value| ThresholdPoint {
            value: *value,
            above_or_equal: *value >= threshold,
        })
        .collect();
    let above = points.iter().filter(|p| p.above_or_equal).count();

    ThresholdSplit {
        threshold,
        below: points.len() - above,
        above,
        points,
    }
}

/// First-occurrence indices of the maximum and minimum values. Categories
/// and values are paired up to the shorter of the two.
pub fn comparison_extremes(categories: &[String], values: &[f64]) -> Option<ComparisonExtremes> {
    let len = categories.len().min(values.len());
    let values = &values[..len];
    let (min, max) = stats::min_max(values)?;
    let max_index = values.iter().position(|v| *v == max)?;
    let min_index = values.iter().position(|v| *v == min)?;

    Some(ComparisonExtremes {
        max_index,
        min_index,
        max_category: categories[max_index].clone(),
        min_category: categories[min_index].clone(),
    })
}

/// Every value equal to the maximum is `Highest`, every other value equal to
/// the minimum is `Lowest`.
pub fn classify_extremes(values: &[f64]) -> Vec<Extreme> {
    let Some((min, max)) = stats::min_max(values) else {
        return Vec::new();
    };

    values
        .iter()
        .map(|value| {
            if *value == max {
                Extreme::Highest
            } else if *value == min {
                Extreme::Lowest
            } else {
                Extreme::Neutral
            }
        })
        .collect()
}

/// Pearson correlation between the series and its positions, `None` when
/// either side has no variance.
pub fn sequence_correlation(series: &[f64]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let positions: Vec<f64> = (0..series.len()).map(|i| i as f64).collect();
    let mean_x = stats::mean(&positions);
    let mean_y = stats::mean(series);

    let covariance: f64 = positions
        .iter()
        .zip(series)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let spread_x: f64 = positions.iter().map(|x| (x - mean_x).powi(2)).sum();
    let spread_y: f64 = series.iter().map(|y| (y - mean_y).powi(2)).sum();

    let denominator = (spread_x * spread_y).sqrt();
    if denominator == 0.0 {
        None
    } else {
        Some(covariance / denominator)
    }
}

/// Derives the pattern payload from the dataset itself, for uploads that
/// arrive without one.
pub fn detect_patterns(dataset: &Dataset) -> PatternReport {
    let scores = dataset.scores();

    PatternReport {
        patterns: Patterns {
            comparison: comparison_pattern(dataset),
            trend: trend_pattern(&scores),
            correlation: correlation_pattern(&scores),
            distribution: DistributionPattern {
                mean: stats::round_to(stats::mean(&scores), 2),
                insight: "Most values are concentrated around the average range.".to_string(),
            },
            anomaly: anomaly_pattern(&scores),
            threshold: threshold_pattern(&scores),
        },
    }
}

fn comparison_pattern(dataset: &Dataset) -> ComparisonPattern {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for entity in dataset.entities() {
        groups
            .entry(entity.name.as_str())
            .or_default()
            .push(entity.primary_score());
    }

    let categories: Vec<String> = groups.keys().map(|name| name.to_string()).collect();
    let values: Vec<f64> = groups
        .values()
        .map(|scores| stats::round_to(stats::mean(scores), 2))
        .collect();

    let extremes = comparison_extremes(&categories, &values);
    let insight = match &extremes {
        Some(extremes) => format!(
            "From the comparison chart, {} shows higher performance compared to {}.",
            extremes.max_category, extremes.min_category
        ),
        None => String::new(),
    };
    let (best_category, worst_category) = match extremes {
        Some(extremes) => (Some(extremes.max_category), Some(extremes.min_category)),
        None => (None, None),
    };

    ComparisonPattern {
        categories,
        values,
        best_category,
        worst_category,
        insight,
    }
}

fn trend_pattern(scores: &[f64]) -> TrendPattern {
    let direction = TrendDirection::of(scores);
    let article = match direction {
        TrendDirection::Upward => "an",
        TrendDirection::Downward | TrendDirection::Stable => "a",
    };

    TrendPattern {
        values: scores.to_vec(),
        trend: direction.as_str().to_string(),
        insight: format!(
            "The trend analysis indicates {article} {} trend over the dataset.",
            direction.as_str()
        ),
    }
}

fn correlation_pattern(scores: &[f64]) -> Option<CorrelationPattern> {
    let value = sequence_correlation(scores)?;
    let insight = if value > 0.0 {
        "A positive correlation is observed between the values and their sequence."
    } else {
        "A negative correlation is observed between the values and their sequence."
    };

    Some(CorrelationPattern {
        correlation_value: stats::round_to(value, 2),
        insight: insight.to_string(),
    })
}

fn anomaly_pattern(scores: &[f64]) -> AnomalyPattern {
    let anomaly_count = flag_anomalies(scores).iter().filter(|p| p.is_anomaly).count();
    let insight = if anomaly_count > 0 {
        "An unusual spike is detected, indicating a potential anomaly."
    } else {
        "No significant anomalies detected in the dataset."
    };

    AnomalyPattern {
        anomaly_count,
        insight: insight.to_string(),
    }
}

fn threshold_pattern(scores: &[f64]) -> ThresholdPattern {
    let split = threshold_split(scores);
    let insight = if split.below > 0 {
        "Several values fall below the defined threshold, indicating underperformance."
    } else {
        "All values are above the defined threshold."
    };

    ThresholdPattern {
        threshold: stats::round_to(split.threshold, 2),
        below_threshold_count: split.below,
        insight: insight.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn histogram_counts_every_value() {
        let series = [3.0, 7.5, 1.0, 9.0, 9.0, 4.2, 6.6];
        let bins = histogram(&series, 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), series.len());
        assert_eq!(bins[4].count, 3);
        assert_eq!(bins[0].label, "1.0–2.6");
    }

    #[test]
    fn flat_series_uses_unit_bins() {
        let bins = histogram(&[10.0, 10.0, 10.0, 10.0], 5);
        assert_eq!(bins[0].count, 4);
        assert_eq!(bins[0].range_low, 10.0);
        assert_eq!(bins[0].range_high, 11.0);
        assert!(bins[1..].iter().all(|b| b.count == 0));
    }

    #[test]
    fn empty_series_has_no_bins() {
        assert!(histogram(&[], 5).is_empty());
        assert_eq!(locate_bin(&[], 5, 1.0), None);
    }

    #[test]
    fn locate_bin_clamps_out_of_range_values() {
        let series = [0.0, 10.0];
        assert_eq!(locate_bin(&series, 5, 10.0), Some(4));
        assert_eq!(locate_bin(&series, 5, -3.0), Some(0));
        assert_eq!(locate_bin(&series, 5, 4.0), Some(2));
    }

    #[test]
    fn five_points_cannot_exceed_two_sigma() {
        // With n = 5 the largest possible |z| is (n - 1) / sqrt(n) < 2.
        let flags = flag_anomalies(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!(flags.iter().all(|p| !p.is_anomaly));
    }

    #[test]
    fn flags_spikes_in_longer_series() {
        let mut series = vec![10.0; 9];
        series.push(100.0);
        let flags = flag_anomalies(&series);
        assert!(flags[9].is_anomaly);
        assert_eq!(flags.iter().filter(|p| p.is_anomaly).count(), 1);
    }

    #[test]
    fn mean_is_never_anomalous() {
        let mut series = vec![1.0, 2.0, 3.0, 4.0, 100.0, 5.0, 6.0];
        series.push(stats::mean(&series));
        let flags = flag_anomalies(&series);
        assert!(!flags[series.len() - 1].is_anomaly);
    }

    #[test]
    fn threshold_ties_count_as_above() {
        let split = threshold_split(&[1.0, 2.0, 3.0]);
        assert_eq!(split.threshold, 2.0);
        assert_eq!(split.above, 2);
        assert_eq!(split.below, 1);
        assert!(split.points[1].above_or_equal);
    }

    #[test]
    fn comparison_extremes_pick_first_occurrence() {
        let extremes =
            comparison_extremes(&labels(&["A", "B", "C", "D"]), &[60.0, 40.0, 60.0, 40.0]).unwrap();
        assert_eq!(extremes.max_index, 0);
        assert_eq!(extremes.min_index, 1);
        assert_eq!(extremes.max_category, "A");
    }

    #[test]
    fn comparison_extremes_pair_shorter_side() {
        let extremes = comparison_extremes(&labels(&["A", "B"]), &[40.0, 60.0, 99.0]).unwrap();
        assert_eq!(extremes.max_category, "B");
        assert!(comparison_extremes(&[], &[1.0]).is_none());
    }

    #[test]
    fn classifies_extremes() {
        assert_eq!(
            classify_extremes(&[40.0, 60.0, 50.0]),
            vec![Extreme::Lowest, Extreme::Highest, Extreme::Neutral]
        );
        assert_eq!(classify_extremes(&[5.0, 5.0]), vec![Extreme::Highest, Extreme::Highest]);
    }

    #[test]
    fn trend_direction_compares_endpoints() {
        assert_eq!(TrendDirection::of(&[1.0, 9.0, 2.0]), TrendDirection::Upward);
        assert_eq!(TrendDirection::of(&[3.0, 1.0]), TrendDirection::Downward);
        assert_eq!(TrendDirection::of(&[]), TrendDirection::Stable);
    }

    #[test]
    fn correlation_requires_variance() {
        assert!((sequence_correlation(&[1.0, 2.0, 3.0]).unwrap() - 1.0).abs() < 0.001);
        assert!((sequence_correlation(&[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 0.001);
        assert_eq!(sequence_correlation(&[4.0, 4.0]), None);
    }

    #[test]
    fn detects_patterns_from_dataset() {
        let dataset = Dataset::new(vec![
            Entity::with_marks("Carol", 70.0),
            Entity::with_marks("Alice", 90.0),
            Entity::with_marks("Bob", 70.0),
        ]);
        let report = detect_patterns(&dataset);
        let patterns = report.patterns;

        assert_eq!(patterns.comparison.categories, labels(&["Alice", "Bob", "Carol"]));
        assert_eq!(
            patterns.comparison.insight,
            "From the comparison chart, Alice shows higher performance compared to Bob."
        );
        assert_eq!(patterns.trend.values, vec![70.0, 90.0, 70.0]);
        assert_eq!(
            patterns.trend.insight,
            "The trend analysis indicates a stable trend over the dataset."
        );
        assert_eq!(
            patterns.threshold.insight,
            "Several values fall below the defined threshold, indicating underperformance."
        );
        assert_eq!(
            patterns.anomaly.insight,
            "No significant anomalies detected in the dataset."
        );
        assert_eq!(patterns.comparison.best_category.as_deref(), Some("Alice"));
        assert_eq!(patterns.comparison.worst_category.as_deref(), Some("Bob"));
        assert_eq!(patterns.trend.trend, "stable");
        assert_eq!(patterns.distribution.mean, 76.67);
        assert_eq!(patterns.anomaly.anomaly_count, 0);
        assert_eq!(patterns.threshold.threshold, 76.67);
        assert_eq!(patterns.threshold.below_threshold_count, 2);
    }

    #[test]
    fn derived_payload_serializes_summary_numbers() {
        let mut entities: Vec<Entity> = (0..9)
            .map(|i| Entity::with_marks(format!("S{i}"), 10.0))
            .collect();
        entities.push(Entity::with_marks("Spike", 100.0));
        let json = serde_json::to_value(detect_patterns(&Dataset::new(entities))).unwrap();

        assert_eq!(json["patterns"]["distribution"]["mean"], 19.0);
        assert_eq!(json["patterns"]["anomaly"]["anomaly_count"], 1);
        assert_eq!(json["patterns"]["threshold"]["below_threshold_count"], 9);
        assert_eq!(json["patterns"]["trend"]["trend"], "upward");
        assert_eq!(json["patterns"]["comparison"]["best_category"], "Spike");
    }

    #[test]
    fn duplicate_names_share_a_category() {
        let dataset = Dataset::new(vec![
            Entity::with_marks("Alice", 90.0),
            Entity::with_marks("Alice", 81.0),
        ]);
        let comparison = detect_patterns(&dataset).patterns.comparison;
        assert_eq!(comparison.categories, labels(&["Alice"]));
        assert_eq!(comparison.values, vec![85.5]);
    }
}
