use crate::models::{
    AttentionEntry, ClassComparison, ClassStatus, Dataset, Entity, EntityStanding, RankedEntity,
    SubjectBreakdown, SubjectComparison, Tier,
};
use crate::stats;

const CLASS_TOLERANCE: f64 = 0.01;

/// Mean primary score, rounded to two decimals before any comparison.
pub fn class_average(dataset: &Dataset) -> f64 {
    stats::round_to(stats::mean(&dataset.scores()), 2)
}

/// `1 + |{scores strictly greater}|`: ties share a rank and ranks skip.
pub fn rank_of(scores: &[f64], score: f64) -> usize {
    1 + stats::count_greater_than(scores, score)
}

/// Share of the dataset ranked strictly ahead, in `[0, 100)`.
pub fn rank_percentile(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (rank - 1) as f64 / total as f64 * 100.0
}

/// Every entity ordered by descending primary score. Equal scores keep
/// dataset order.
pub fn rank_all(dataset: &Dataset) -> Vec<RankedEntity> {
    let scores = dataset.scores();
    let total = scores.len();

    let mut ranked: Vec<RankedEntity> = dataset
        .entities()
        .iter()
        .zip(scores.iter())
        .map(|(entity, score)| {
            let rank = rank_of(&scores, *score);
            RankedEntity {
                name: entity.name.clone(),
                score: *score,
                rank,
                percentile: rank_percentile(rank, total),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

pub fn top_k(ranked: &[RankedEntity], k: usize) -> &[RankedEntity] {
    &ranked[..k.min(ranked.len())]
}

pub fn standing_of(dataset: &Dataset, entity: &Entity) -> EntityStanding {
    let scores = dataset.scores();
    let score = entity.primary_score();
    let rank = rank_of(&scores, score);
    let percentile = rank_percentile(rank, scores.len());

    EntityStanding {
        name: entity.name.clone(),
        score,
        rank,
        percentile,
        tier: Tier::from_percentile(percentile),
        total: scores.len(),
    }
}

pub fn below_average_count(dataset: &Dataset, class_average: f64) -> usize {
    stats::count_less_than(&dataset.scores(), class_average)
}

/// Share of entities scoring strictly below `score`, used to place an entity
/// inside the distribution.
pub fn position_percentile(dataset: &Dataset, score: f64) -> f64 {
    let scores = dataset.scores();
    if scores.is_empty() {
        return 0.0;
    }
    stats::count_less_than(&scores, score) as f64 / scores.len() as f64 * 100.0
}

fn status_of(difference: f64, tolerance: f64) -> ClassStatus {
    if difference > tolerance {
        ClassStatus::Above
    } else if difference < -tolerance {
        ClassStatus::Below
    } else {
        ClassStatus::At
    }
}

pub fn compare_with_class(score: f64, class_average: f64) -> ClassComparison {
    let difference = stats::round_to(score - class_average, 2);

    ClassComparison {
        entity_score: score,
        class_average,
        status: status_of(difference, CLASS_TOLERANCE),
        difference,
    }
}

pub fn subject_label(subject: &str) -> String {
    let mut chars = subject.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Class mean per subject the dataset carries, rounded to two decimals.
/// Entities without the subject count as 0.
pub fn subject_averages(dataset: &Dataset) -> Vec<(&'static str, f64)> {
    dataset
        .subjects()
        .into_iter()
        .map(|subject| {
            let values: Vec<f64> = dataset
                .entities()
                .iter()
                .map(|entity| entity.subject(subject).unwrap_or(0.0))
                .collect();
            (subject, stats::round_to(stats::mean(&values), 2))
        })
        .collect()
}

/// Strictly above the subject average is a strength, strictly below an
/// improvement area; equal scores land in neither list.
pub fn subject_breakdown(entity: &Entity, averages: &[(&'static str, f64)]) -> SubjectBreakdown {
    let mut breakdown = SubjectBreakdown::default();

    for (subject, class_average) in averages {
        let score = entity.subject(subject).unwrap_or(0.0);
        let comparison = SubjectComparison {
            subject: subject_label(subject),
            score,
            class_average: *class_average,
            difference: stats::round_to(score - class_average, 2),
            status: status_of(score - class_average, 0.0),
        };

        match comparison.status {
            ClassStatus::Above => breakdown.strengths.push(comparison),
            ClassStatus::Below => breakdown.improvements.push(comparison),
            ClassStatus::At => {}
        }
    }

    breakdown
}

fn weakest_subject(entity: &Entity) -> Option<String> {
    entity
        .subject_scores()
        .into_iter()
        .fold(None, |weakest: Option<(&str, f64)>, (subject, score)| match weakest {
            Some((_, lowest)) if score >= lowest => weakest,
            _ => Some((subject, score)),
        })
        .map(|(subject, _)| subject_label(subject))
}

/// Entities below the class average, weakest first.
pub fn needing_attention(dataset: &Dataset) -> Vec<AttentionEntry> {
    let average = class_average(dataset);

    let mut entries: Vec<AttentionEntry> = dataset
        .entities()
        .iter()
        .filter_map(|entity| {
            let score = entity.primary_score();
            (score < average).then(|| AttentionEntry {
                name: entity.name.clone(),
                score,
                weakest_subject: weakest_subject(entity),
                improvement_needed: stats::round_to(average - score, 2),
            })
        })
        .collect();

    entries.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    entries
}
