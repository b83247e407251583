use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::NameMatch;
use crate::stats;

pub const MARKS: &str = "marks";
pub const SUBJECTS: [&str; 3] = ["math", "biology", "physics"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    pub metrics: BTreeMap<String, f64>,
}

impl Entity {
    pub fn new(name: impl Into<String>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            name: name.into(),
            metrics,
        }
    }

    #[cfg(test)]
    pub fn with_marks(name: impl Into<String>, marks: f64) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(MARKS.to_string(), marks);
        Self::new(name, metrics)
    }

    pub fn subject(&self, subject: &str) -> Option<f64> {
        self.metrics.get(subject).copied()
    }

    /// Subject metrics present on this entity, in canonical subject order.
    pub fn subject_scores(&self) -> Vec<(&'static str, f64)> {
        SUBJECTS
            .iter()
            .filter_map(|subject| self.subject(subject).map(|value| (*subject, value)))
            .collect()
    }

    /// The marks column when no subject carries a value, otherwise the mean
    /// of the subject metrics.
    pub fn primary_score(&self) -> f64 {
        let subjects: Vec<f64> = self.subject_scores().into_iter().map(|(_, v)| v).collect();
        let has_subjects = subjects.iter().any(|v| *v != 0.0);

        match self.metrics.get(MARKS) {
            Some(marks) if !has_subjects => *marks,
            _ => stats::mean(&subjects),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    entities: Vec<Entity>,
}

impl Dataset {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.entities.iter().map(Entity::primary_score).collect()
    }

    /// Subjects that at least one entity carries, in canonical order.
    pub fn subjects(&self) -> Vec<&'static str> {
        SUBJECTS
            .iter()
            .copied()
            .filter(|subject| self.entities.iter().any(|e| e.metrics.contains_key(*subject)))
            .collect()
    }

    pub fn find(&self, name: &str, mode: NameMatch) -> Option<&Entity> {
        let names: Vec<&str> = self.entities.iter().map(|e| e.name.as_str()).collect();
        mode.resolve(&names, name).map(|index| &self.entities[index])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub range_low: f64,
    pub range_high: f64,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyPoint {
    pub value: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPoint {
    pub value: f64,
    pub above_or_equal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSplit {
    pub threshold: f64,
    pub points: Vec<ThresholdPoint>,
    pub above: usize,
    pub below: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonExtremes {
    pub max_index: usize,
    pub min_index: usize,
    pub max_category: String,
    pub min_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    pub name: String,
    pub score: f64,
    pub rank: usize,
    pub percentile: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    #[serde(rename = "Top Performer")]
    TopPerformer,
    #[serde(rename = "Above Average")]
    AboveAverage,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl Tier {
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile <= 10.0 {
            Tier::TopPerformer
        } else if percentile <= 50.0 {
            Tier::AboveAverage
        } else if percentile <= 75.0 {
            Tier::Average
        } else {
            Tier::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::TopPerformer => "Top Performer",
            Tier::AboveAverage => "Above Average",
            Tier::Average => "Average",
            Tier::NeedsImprovement => "Needs Improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStanding {
    pub name: String,
    pub score: f64,
    pub rank: usize,
    pub percentile: f64,
    pub tier: Tier,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    Above,
    At,
    Below,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Above => "above",
            ClassStatus::At => "at",
            ClassStatus::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassComparison {
    pub entity_score: f64,
    pub class_average: f64,
    pub status: ClassStatus,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectComparison {
    pub subject: String,
    pub score: f64,
    pub class_average: f64,
    pub difference: f64,
    pub status: ClassStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubjectBreakdown {
    pub strengths: Vec<SubjectComparison>,
    pub improvements: Vec<SubjectComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionEntry {
    pub name: String,
    pub score: f64,
    pub weakest_subject: Option<String>,
    pub improvement_needed: f64,
}

/// Pattern-detection payload, either uploaded alongside the table or derived
/// from it by [`crate::patterns::detect_patterns`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub patterns: Patterns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patterns {
    #[serde(default)]
    pub comparison: ComparisonPattern,
    #[serde(default)]
    pub trend: TrendPattern,
    #[serde(default)]
    pub correlation: Option<CorrelationPattern>,
    #[serde(default)]
    pub distribution: DistributionPattern,
    #[serde(default)]
    pub anomaly: AnomalyPattern,
    #[serde(default)]
    pub threshold: ThresholdPattern,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPattern {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub best_category: Option<String>,
    #[serde(default)]
    pub worst_category: Option<String>,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendPattern {
    #[serde(default)]
    pub values: Vec<f64>,
    /// `upward`, `downward` or `stable`; empty when the uploader left it out.
    #[serde(default)]
    pub trend: String,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPattern {
    pub correlation_value: f64,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionPattern {
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPattern {
    #[serde(default)]
    pub anomaly_count: usize,
    #[serde(default)]
    pub insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPattern {
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub below_threshold_count: usize,
    #[serde(default)]
    pub insight: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject_entity(name: &str, math: f64, biology: f64, physics: f64) -> Entity {
        let mut metrics = BTreeMap::new();
        metrics.insert("math".to_string(), math);
        metrics.insert("biology".to_string(), biology);
        metrics.insert("physics".to_string(), physics);
        Entity::new(name, metrics)
    }

    #[test]
    fn primary_score_prefers_marks_without_subjects() {
        assert_eq!(Entity::with_marks("Alice", 90.0).primary_score(), 90.0);
    }

    #[test]
    fn primary_score_averages_subjects() {
        let mut entity = subject_entity("Alice", 85.0, 90.0, 88.0);
        entity.metrics.insert(MARKS.to_string(), 10.0);
        assert!((entity.primary_score() - 87.6667).abs() < 0.001);
    }

    #[test]
    fn zeroed_subjects_fall_back_to_marks() {
        let mut entity = subject_entity("Alice", 0.0, 0.0, 0.0);
        entity.metrics.insert(MARKS.to_string(), 72.0);
        assert_eq!(entity.primary_score(), 72.0);
    }

    #[test]
    fn tiers_follow_percentile_bands() {
        assert_eq!(Tier::from_percentile(0.0), Tier::TopPerformer);
        assert_eq!(Tier::from_percentile(10.0), Tier::TopPerformer);
        assert_eq!(Tier::from_percentile(33.3), Tier::AboveAverage);
        assert_eq!(Tier::from_percentile(75.0), Tier::Average);
        assert_eq!(Tier::from_percentile(80.0), Tier::NeedsImprovement);
    }

    #[test]
    fn dataset_lists_only_present_subjects() {
        let mut metrics = BTreeMap::new();
        metrics.insert("physics".to_string(), 70.0);
        let dataset = Dataset::new(vec![
            Entity::new("Alice", metrics),
            Entity::with_marks("Bob", 50.0),
        ]);
        assert_eq!(dataset.subjects(), vec!["physics"]);
    }

    #[test]
    fn patterns_accept_partial_payloads() {
        let payload = r#"{"valid": true, "patterns": {"trend": {"values": [1, 2.5], "insight": "up"}}}"#;
        let report: PatternReport = serde_json::from_str(payload).unwrap();
        assert_eq!(report.patterns.trend.values, vec![1.0, 2.5]);
        assert!(report.patterns.comparison.categories.is_empty());
        assert!(report.patterns.correlation.is_none());
        assert_eq!(report.patterns.trend.trend, "");
        assert_eq!(report.patterns.threshold.below_threshold_count, 0);
    }

    #[test]
    fn patterns_keep_summary_numbers() {
        let payload = r#"{"patterns": {
            "comparison": {"categories": ["A"], "values": [1], "best_category": "A", "worst_category": "A"},
            "distribution": {"mean": 76.67, "insight": "centred"},
            "anomaly": {"anomaly_count": 2, "insight": "spikes"},
            "threshold": {"threshold": 76.67, "below_threshold_count": 2, "insight": "low"}
        }}"#;
        let patterns = serde_json::from_str::<PatternReport>(payload).unwrap().patterns;
        assert_eq!(patterns.comparison.best_category.as_deref(), Some("A"));
        assert_eq!(patterns.distribution.mean, 76.67);
        assert_eq!(patterns.anomaly.anomaly_count, 2);
        assert_eq!(patterns.threshold.below_threshold_count, 2);
    }
}
