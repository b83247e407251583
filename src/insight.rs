//! Sentence templates for every derivation the views surface.

use crate::models::{
    ClassComparison, ClassStatus, ComparisonExtremes, HistogramBin, SubjectBreakdown,
    SubjectComparison,
};
use crate::stats;

pub const NO_DATA: &str = "No data available to analyze.";
pub const ALL_AT_OR_ABOVE: &str = "Excellent! All students are at or above class average.";

/// Plain number rendering: integers without decimals, otherwise at most two.
pub fn display_number(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{value:.0}");
    }
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn not_found(name: &str) -> String {
    format!("Student name \"{}\" not found in dataset.", name.trim())
}

pub fn passthrough(upstream: &str) -> String {
    if upstream.trim().is_empty() {
        NO_DATA.to_string()
    } else {
        upstream.to_string()
    }
}

pub fn comparison(extremes: Option<&ComparisonExtremes>) -> String {
    match extremes {
        Some(extremes) => format!(
            "From the comparison chart, {} shows the highest performance, while {} shows the lowest performance.",
            extremes.max_category, extremes.min_category
        ),
        None => NO_DATA.to_string(),
    }
}

pub fn threshold(above: usize, below: usize) -> String {
    let total = above + below;
    if total == 0 {
        return NO_DATA.to_string();
    }

    let below_share = below as f64 / total as f64 * 100.0;
    let above_share = above as f64 / total as f64 * 100.0;

    if below_share > 60.0 {
        "A majority of values fall below the defined threshold, indicating underperformance."
    } else if above_share > 50.0 {
        "Most values exceed the threshold, indicating acceptable or improving performance."
    } else {
        "Values are distributed around the threshold, indicating mixed performance."
    }
    .to_string()
}

fn percent_gap(other: f64, mine: f64) -> f64 {
    stats::round_to((other - mine) / mine * 100.0, 1)
}

/// Where `mine` sits among `values`, phrased for the entity itself.
pub fn entity_comparison(values: &[f64], mine: f64) -> String {
    let Some((min, max)) = stats::min_max(values) else {
        return NO_DATA.to_string();
    };

    if mine >= max {
        return "You top the dataset.".to_string();
    }
    if mine <= min {
        return "You are currently at the bottom of the dataset.".to_string();
    }

    let next = values
        .iter()
        .copied()
        .filter(|v| *v > mine)
        .fold(max, f64::min);

    if mine == 0.0 {
        // A zero score has no percentage gap.
        return format!(
            "You are {} points away from the next higher performer and {} points away from topping the dataset.",
            display_number(next - mine),
            display_number(max - mine)
        );
    }

    format!(
        "You are {:.1}% away from the next higher performer and {:.1}% away from topping the dataset.",
        percent_gap(next, mine),
        percent_gap(max, mine)
    )
}

pub fn subject_detail(comparison: &SubjectComparison) -> String {
    format!(
        "{}: {} is {} class average ({})",
        comparison.subject,
        display_number(comparison.score),
        comparison.status.as_str(),
        display_number(comparison.class_average)
    )
}

pub fn subjects(breakdown: &SubjectBreakdown) -> String {
    let names = |list: &[SubjectComparison]| {
        list.iter()
            .map(|s| s.subject.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut clauses = Vec::new();
    if !breakdown.strengths.is_empty() {
        clauses.push(format!("Strengths: {}.", names(breakdown.strengths.as_slice())));
    }
    if !breakdown.improvements.is_empty() {
        clauses.push(format!(
            "Areas for improvement: {}.",
            names(breakdown.improvements.as_slice())
        ));
    }

    if clauses.is_empty() {
        "Your performance is consistent with the class average across all subjects.".to_string()
    } else {
        clauses.join(" ")
    }
}

pub fn range_label(percentile: f64) -> &'static str {
    if percentile >= 75.0 {
        "upper"
    } else if percentile >= 50.0 {
        "middle"
    } else {
        "lower"
    }
}

pub fn distribution_position(
    bin: &HistogramBin,
    percentile: f64,
    comparison: &ClassComparison,
) -> String {
    format!(
        "Your score of {} falls in the {} band, placing you in the {} range of the class and {} the class average of {:.2}.",
        display_number(comparison.entity_score),
        bin.label,
        range_label(percentile),
        comparison.status.as_str(),
        comparison.class_average
    )
}

pub fn class_comparison(comparison: &ClassComparison) -> String {
    match comparison.status {
        ClassStatus::At => format!(
            "Your average of {:.2} matches the class average.",
            comparison.entity_score
        ),
        status => format!(
            "Your average of {:.2} is {} the class average of {:.2} by {:.2} points.",
            comparison.entity_score,
            status.as_str(),
            comparison.class_average,
            comparison.difference.abs()
        ),
    }
}

pub fn attention(count: usize, total: usize) -> String {
    if count == 0 {
        ALL_AT_OR_ABOVE.to_string()
    } else {
        format!("{count} of {total} below average")
    }
}
