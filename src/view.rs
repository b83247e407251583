use std::borrow::Cow;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::insight;
use crate::models::{
    AnomalyPoint, AttentionEntry, ClassComparison, Dataset, Entity, EntityStanding,
    HistogramBin, PatternReport, RankedEntity, SubjectBreakdown, ThresholdSplit, Tier,
};
use crate::patterns::{self, Extreme};
use crate::ranking;

/// Everything a projection reads. Built once per request and never mutated.
#[derive(Debug, Clone)]
pub struct ViewContext<'a> {
    dataset: &'a Dataset,
    patterns: Cow<'a, PatternReport>,
    config: AnalysisConfig,
}

impl<'a> ViewContext<'a> {
    /// Uses patterns derived from the dataset itself.
    pub fn new(dataset: &'a Dataset, config: AnalysisConfig) -> Self {
        Self {
            dataset,
            patterns: Cow::Owned(patterns::detect_patterns(dataset)),
            config,
        }
    }

    pub fn with_patterns(
        dataset: &'a Dataset,
        patterns: &'a PatternReport,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            dataset,
            patterns: Cow::Borrowed(patterns),
            config,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn patterns(&self) -> &PatternReport {
        &self.patterns
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Highlight {
    Highest,
    Lowest,
    Neutral,
    Focal,
}

impl From<Extreme> for Highlight {
    fn from(extreme: Extreme) -> Self {
        match extreme {
            Extreme::Highest => Highlight::Highest,
            Extreme::Lowest => Highlight::Lowest,
            Extreme::Neutral => Highlight::Neutral,
        }
    }
}

pub fn highlight_color(highlight: Highlight) -> &'static str {
    match highlight {
        Highlight::Highest => "#4CAF50",
        Highlight::Lowest => "#F44336",
        Highlight::Neutral => "#2196F3",
        Highlight::Focal => "#FF9800",
    }
}

pub fn tier_color(tier: Tier) -> &'static str {
    match tier {
        Tier::TopPerformer => "#238636",
        Tier::AboveAverage => "#1F6FEB",
        Tier::Average => "#FF9800",
        Tier::NeedsImprovement => "#F44336",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonBar {
    pub category: String,
    pub value: f64,
    pub highlight: Highlight,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonChart {
    pub bars: Vec<ComparisonBar>,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendChart {
    pub values: Vec<f64>,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionChart {
    pub bins: Vec<HistogramBin>,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyChart {
    pub points: Vec<AnomalyPoint>,
    pub anomaly_count: usize,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdChart {
    pub split: ThresholdSplit,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBundle {
    pub comparison: ComparisonChart,
    pub trend: TrendChart,
    pub distribution: DistributionChart,
    pub anomaly: AnomalyChart,
    pub threshold: ThresholdChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminView {
    pub total: usize,
    pub class_average: f64,
    pub below_average_count: usize,
    pub ranked: Vec<RankedEntity>,
    pub top_performers: Vec<RankedEntity>,
    pub attention: Vec<AttentionEntry>,
    pub attention_summary: String,
    pub summary: String,
    pub charts: ChartBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProjection {
    pub standing: EntityStanding,
    pub tier_color: &'static str,
    pub class_comparison: ClassComparison,
    pub class_insight: String,
    pub subjects: SubjectBreakdown,
    pub subject_details: Vec<String>,
    pub subject_insight: String,
    pub comparison_insight: String,
    pub distribution_insight: String,
    pub charts: ChartBundle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StudentView {
    Found(Box<StudentProjection>),
    NotFound { query: String, insight: String },
}

fn comparison_bars(ctx: &ViewContext<'_>, focal: Option<usize>) -> Vec<ComparisonBar> {
    let comparison = &ctx.patterns().patterns.comparison;
    let extremes = patterns::classify_extremes(&comparison.values);

    comparison
        .categories
        .iter()
        .zip(comparison.values.iter())
        .zip(extremes)
        .enumerate()
        .map(|(index, ((category, value), extreme))| {
            let highlight = if focal == Some(index) {
                Highlight::Focal
            } else {
                Highlight::from(extreme)
            };
            ComparisonBar {
                category: category.clone(),
                value: *value,
                highlight,
                color: highlight_color(highlight),
            }
        })
        .collect()
}

/// Charts over the upstream trend series, shared by both audiences.
fn chart_bundle(ctx: &ViewContext<'_>, focal: Option<usize>) -> ChartBundle {
    let upstream = &ctx.patterns().patterns;
    let series = &upstream.trend.values;

    let extremes = patterns::comparison_extremes(
        &upstream.comparison.categories,
        &upstream.comparison.values,
    );
    let points = patterns::flag_anomalies(series);
    let anomaly_count = points.iter().filter(|p| p.is_anomaly).count();
    let split = patterns::threshold_split(series);
    let threshold_insight = insight::threshold(split.above, split.below);

    ChartBundle {
        comparison: ComparisonChart {
            bars: comparison_bars(ctx, focal),
            insight: insight::comparison(extremes.as_ref()),
        },
        trend: TrendChart {
            values: series.clone(),
            insight: insight::passthrough(&upstream.trend.insight),
        },
        distribution: DistributionChart {
            bins: patterns::histogram(series, ctx.config().bin_count),
            insight: insight::passthrough(&upstream.distribution.insight),
        },
        anomaly: AnomalyChart {
            points,
            anomaly_count,
            insight: insight::passthrough(&upstream.anomaly.insight),
        },
        threshold: ThresholdChart {
            split,
            insight: threshold_insight,
        },
    }
}

pub fn project_admin(ctx: &ViewContext<'_>) -> AdminView {
    let dataset = ctx.dataset();
    let class_average = ranking::class_average(dataset);
    let ranked = ranking::rank_all(dataset);
    let top_performers = ranking::top_k(&ranked, ctx.config().top_k).to_vec();
    let attention = ranking::needing_attention(dataset);
    let below_average_count = ranking::below_average_count(dataset, class_average);

    let summary = if dataset.is_empty() {
        insight::NO_DATA.to_string()
    } else {
        format!(
            "{} students analysed with a class average of {:.2}; {} below average.",
            dataset.len(),
            class_average,
            below_average_count
        )
    };

    AdminView {
        total: dataset.len(),
        class_average,
        below_average_count,
        attention_summary: insight::attention(attention.len(), dataset.len()),
        ranked,
        top_performers,
        attention,
        summary,
        charts: chart_bundle(ctx, None),
    }
}

fn distribution_insight(ctx: &ViewContext<'_>, comparison: &ClassComparison) -> String {
    let scores = ctx.dataset().scores();
    let bins = patterns::histogram(&scores, ctx.config().bin_count);
    let located = patterns::locate_bin(&scores, ctx.config().bin_count, comparison.entity_score)
        .and_then(|index| bins.get(index));

    match located {
        Some(bin) => {
            let percentile = ranking::position_percentile(ctx.dataset(), comparison.entity_score);
            insight::distribution_position(bin, percentile, comparison)
        }
        None => insight::NO_DATA.to_string(),
    }
}

fn focal_comparison(ctx: &ViewContext<'_>, entity: &Entity) -> (Option<usize>, String) {
    let comparison = &ctx.patterns().patterns.comparison;
    let paired = comparison.categories.len().min(comparison.values.len());
    let focal = ctx
        .config()
        .name_match
        .resolve(&comparison.categories[..paired], &entity.name);

    let text = match focal {
        Some(index) => insight::entity_comparison(&comparison.values, comparison.values[index]),
        None => insight::entity_comparison(&ctx.dataset().scores(), entity.primary_score()),
    };
    (focal, text)
}

pub fn project_student(ctx: &ViewContext<'_>, name: &str) -> StudentView {
    let dataset = ctx.dataset();
    let Some(entity) = dataset.find(name, ctx.config().name_match) else {
        return StudentView::NotFound {
            query: name.trim().to_string(),
            insight: insight::not_found(name),
        };
    };

    let standing = ranking::standing_of(dataset, entity);
    let class_comparison =
        ranking::compare_with_class(standing.score, ranking::class_average(dataset));
    let subjects = ranking::subject_breakdown(entity, &ranking::subject_averages(dataset));
    let subject_details = subjects
        .strengths
        .iter()
        .chain(subjects.improvements.iter())
        .map(insight::subject_detail)
        .collect();
    let (focal, comparison_insight) = focal_comparison(ctx, entity);
    let distribution_insight = distribution_insight(ctx, &class_comparison);

    let mut charts = chart_bundle(ctx, focal);
    charts.comparison.insight = comparison_insight.clone();
    charts.distribution.insight = distribution_insight.clone();

    StudentView::Found(Box::new(StudentProjection {
        tier_color: tier_color(standing.tier),
        class_insight: insight::class_comparison(&class_comparison),
        subject_insight: insight::subjects(&subjects),
        standing,
        class_comparison,
        subjects,
        subject_details,
        comparison_insight,
        distribution_insight,
        charts,
    }))
}
