use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod insight;
mod models;
mod normalize;
mod patterns;
mod ranking;
mod report;
mod stats;
mod view;

use config::{AnalysisConfig, DEFAULT_BIN_COUNT, DEFAULT_TOP_K};
use models::{Dataset, PatternReport};
use view::{StudentView, ViewContext};

#[derive(Parser)]
#[command(name = "cohort-insight")]
#[command(about = "Class performance statistics and insights from an uploaded CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// CSV table with a header row
    #[arg(long)]
    csv: PathBuf,
    /// Pattern-detection JSON to use instead of deriving it from the table
    #[arg(long)]
    patterns: Option<PathBuf>,
    #[arg(long, env = "INSIGHT_BIN_COUNT", default_value_t = DEFAULT_BIN_COUNT)]
    bins: usize,
    #[arg(long, env = "INSIGHT_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top: usize,
    /// Fall back to substring matching when no name matches exactly
    #[arg(long, env = "INSIGHT_PARTIAL_NAMES")]
    partial_names: bool,
}

impl Source {
    fn config(&self) -> AnalysisConfig {
        AnalysisConfig::new(self.bins, self.top, self.partial_names)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the pattern-detection payload derived from a table
    Patterns {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Aggregate view over the whole class
    Admin {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        json: bool,
    },
    /// Single-student view
    Student {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let table = normalize::read_table(path)
        .with_context(|| format!("failed to read table from {}", path.display()))?;
    if let Some(summary) = normalize::check_table(&table) {
        info!(
            rows = summary.rows,
            numeric = summary.numeric_columns.len(),
            categorical = summary.categorical_columns.len(),
            "table validated"
        );
    }
    let dataset = normalize::normalize(&table);
    info!(entities = dataset.len(), "dataset normalized");
    Ok(dataset)
}

fn load_patterns(path: Option<&Path>) -> anyhow::Result<Option<PatternReport>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read patterns from {}", path.display()))?;
    let report = serde_json::from_str(&text)
        .map_err(error::InsightError::from)
        .with_context(|| format!("invalid patterns JSON in {}", path.display()))?;
    Ok(Some(report))
}

fn context<'a>(
    dataset: &'a Dataset,
    patterns: Option<&'a PatternReport>,
    config: AnalysisConfig,
) -> ViewContext<'a> {
    match patterns {
        Some(patterns) => ViewContext::with_patterns(dataset, patterns, config),
        None => ViewContext::new(dataset, config),
    }
}

fn print_admin(view: &view::AdminView) {
    println!("{}", view.summary);
    if view.top_performers.is_empty() {
        return;
    }

    println!("Top performers:");
    for performer in view.top_performers.iter() {
        println!(
            "- #{} {} score {:.2} (percentile {:.1})",
            performer.rank, performer.name, performer.score, performer.percentile
        );
    }
    println!("{}", view.attention_summary);
    println!("{}", view.charts.comparison.insight);
    println!("{}", view.charts.threshold.insight);
}

fn print_student(view: &StudentView) {
    let projection = match view {
        StudentView::Found(projection) => projection,
        StudentView::NotFound { insight, .. } => {
            println!("{insight}");
            return;
        }
    };

    let standing = &projection.standing;
    println!(
        "{}: rank {} / {} ({}), score {:.2}",
        standing.name,
        standing.rank,
        standing.total,
        standing.tier.label(),
        standing.score
    );
    println!("{}", projection.class_insight);
    println!("{}", projection.subject_insight);
    for detail in projection.subject_details.iter() {
        println!("- {detail}");
    }
    println!("{}", projection.comparison_insight);
    println!("{}", projection.distribution_insight);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Patterns { csv } => {
            let dataset = load_dataset(&csv)?;
            let report = patterns::detect_patterns(&dataset);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Admin { source, json } => {
            let dataset = load_dataset(&source.csv)?;
            let patterns = load_patterns(source.patterns.as_deref())?;
            let ctx = context(&dataset, patterns.as_ref(), source.config());
            let view = view::project_admin(&ctx);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_admin(&view);
            }
        }
        Commands::Student { source, name, json } => {
            let dataset = load_dataset(&source.csv)?;
            let patterns = load_patterns(source.patterns.as_deref())?;
            let ctx = context(&dataset, patterns.as_ref(), source.config());
            let view = view::project_student(&ctx, &name);

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_student(&view);
            }
        }
        Commands::Report { source, name, out } => {
            let dataset = load_dataset(&source.csv)?;
            let patterns = load_patterns(source.patterns.as_deref())?;
            let ctx = context(&dataset, patterns.as_ref(), source.config());
            let today = chrono::Utc::now().date_naive();

            let report = match name.as_deref() {
                Some(name) => report::build_student_report(&view::project_student(&ctx, name), today),
                None => report::build_admin_report(&view::project_admin(&ctx), today),
            };
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
