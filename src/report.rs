use std::fmt::Write;

use chrono::NaiveDate;

use crate::insight;
use crate::models::SubjectComparison;
use crate::view::{AdminView, ChartBundle, StudentView};

fn write_chart_insights(output: &mut String, charts: &ChartBundle) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Chart Insights");
    let _ = writeln!(output, "- Comparison: {}", charts.comparison.insight);
    let _ = writeln!(output, "- Trend: {}", charts.trend.insight);
    let _ = writeln!(output, "- Distribution: {}", charts.distribution.insight);
    let _ = writeln!(
        output,
        "- Anomaly: {} ({} flagged)",
        charts.anomaly.insight, charts.anomaly.anomaly_count
    );
    let _ = writeln!(
        output,
        "- Threshold: {} (threshold {:.2}, {} above, {} below)",
        charts.threshold.insight,
        charts.threshold.split.threshold,
        charts.threshold.split.above,
        charts.threshold.split.below
    );
}

pub fn build_admin_report(view: &AdminView, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Admin Analytics Report");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Class Overview");
    let _ = writeln!(output, "{}", view.summary);
    let _ = writeln!(output, "- Total students: {}", view.total);
    let _ = writeln!(output, "- Class average: {:.2}", view.class_average);
    let _ = writeln!(output, "- Below average: {}", view.below_average_count);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Performers");

    if view.top_performers.is_empty() {
        let _ = writeln!(output, "No students in this dataset.");
    } else {
        for performer in view.top_performers.iter() {
            let _ = writeln!(
                output,
                "- #{} {} ({:.2})",
                performer.rank, performer.name, performer.score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    if view.attention.is_empty() {
        let _ = writeln!(output, "{}", view.attention_summary);
    } else {
        for entry in view.attention.iter() {
            let _ = writeln!(
                output,
                "- {} avg {:.2}, weakest {}, needs +{:.2}",
                entry.name,
                entry.score,
                entry.weakest_subject.as_deref().unwrap_or("n/a"),
                entry.improvement_needed
            );
        }
        let _ = writeln!(output, "{}", view.attention_summary);
    }

    write_chart_insights(&mut output, &view.charts);
    output
}

fn write_subjects(output: &mut String, title: &str, subjects: &[SubjectComparison], empty: &str) {
    let _ = writeln!(output, "### {}", title);
    if subjects.is_empty() {
        let _ = writeln!(output, "{}", empty);
    } else {
        for subject in subjects {
            let _ = writeln!(
                output,
                "- {} ({:+.2})",
                insight::subject_detail(subject),
                subject.difference
            );
        }
    }
}

pub fn build_student_report(view: &StudentView, generated_on: NaiveDate) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Performance Report");
    let _ = writeln!(output, "Generated on {}", generated_on);
    let _ = writeln!(output);

    let projection = match view {
        StudentView::Found(projection) => projection,
        StudentView::NotFound { insight, .. } => {
            let _ = writeln!(output, "{}", insight);
            return output;
        }
    };

    let standing = &projection.standing;
    let _ = writeln!(output, "## {}", standing.name);
    let _ = writeln!(output, "- Rank: {} / {}", standing.rank, standing.total);
    let _ = writeln!(output, "- Percentile: {:.1}", standing.percentile);
    let _ = writeln!(output, "- Status: {}", standing.tier.label());
    let _ = writeln!(output, "- Average: {:.2}", standing.score);
    let _ = writeln!(output, "{}", projection.class_insight);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Performance");
    let _ = writeln!(output, "{}", projection.subject_insight);
    write_subjects(
        &mut output,
        "Areas of Excellence",
        &projection.subjects.strengths,
        "No subjects above class average at this time.",
    );
    write_subjects(
        &mut output,
        "Areas for Improvement",
        &projection.subjects.improvements,
        "Excellent! All subjects are at or above class average.",
    );

    write_chart_insights(&mut output, &projection.charts);
    output
}
