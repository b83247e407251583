use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{InsightError, Result};
use crate::models::{Dataset, Entity, MARKS, SUBJECTS};

const NAME_ALIASES: [&str; 2] = ["name", "student"];
const PRIMARY_ALIASES: [&str; 4] = ["marks", "score", "performance", "value"];
const DEFAULT_NAME_INDEX: usize = 0;
const DEFAULT_PRIMARY_INDEX: usize = 1;
const MIN_ROWS: usize = 10;

/// Header row plus string body rows, as uploaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }
}

/// Column positions resolved once per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    pub primary: usize,
    pub subjects: Vec<(&'static str, usize)>,
}

impl ColumnMap {
    pub fn resolve(header: &[String]) -> Self {
        let name = find_alias(header, &NAME_ALIASES).unwrap_or_else(|| {
            debug!("no name column found, using column {DEFAULT_NAME_INDEX}");
            DEFAULT_NAME_INDEX
        });
        let primary = find_alias(header, &PRIMARY_ALIASES).unwrap_or_else(|| {
            // Never read marks from the name column.
            let fallback = if name == DEFAULT_PRIMARY_INDEX {
                DEFAULT_NAME_INDEX
            } else {
                DEFAULT_PRIMARY_INDEX
            };
            debug!("no marks column found, using column {fallback}");
            fallback
        });
        let subjects = SUBJECTS
            .iter()
            .filter_map(|subject| {
                header
                    .iter()
                    .position(|h| h.trim() == *subject)
                    .map(|index| (*subject, index))
            })
            .collect();

        Self {
            name,
            primary,
            subjects,
        }
    }
}

fn find_alias(header: &[String], aliases: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
}

/// Never fails: unparseable or non-finite cells become 0.
pub fn parse_number(cell: &str) -> f64 {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn is_number(cell: &str) -> bool {
    cell.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

pub fn normalize(table: &RawTable) -> Dataset {
    let columns = ColumnMap::resolve(&table.header);
    let mut entities = Vec::with_capacity(table.rows.len());

    for (line, row) in table.rows.iter().enumerate() {
        let name = row
            .get(columns.name)
            .map(|cell| cell.trim())
            .unwrap_or_default();
        if name.is_empty() {
            debug!(row = line + 1, "dropping row without a name");
            continue;
        }

        let cell = |index: usize| parse_number(row.get(index).map(String::as_str).unwrap_or(""));
        let mut metrics = BTreeMap::new();
        metrics.insert(MARKS.to_string(), cell(columns.primary));
        for (subject, index) in columns.subjects.iter() {
            metrics.insert(subject.to_string(), cell(*index));
        }

        entities.push(Entity::new(name, metrics));
    }

    Dataset::new(entities)
}

pub fn read_table(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path)?;
    parse_table(&text)
}

pub fn parse_table(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut records = records.into_iter();
    let header = records.next().ok_or(InsightError::EmptyTable)?;
    Ok(RawTable::new(header, records.collect()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("Dataset must contain more than 10 rows (found {0})")]
    TooFewRows(usize),

    #[error("Dataset must contain at least one numerical column")]
    NoNumericColumn,

    #[error("Dataset must contain at least one categorical column")]
    NoCategoricalColumn,
}

/// Checks that a table is worth analysing. A column is numeric when every
/// non-empty cell parses as a finite number.
pub fn validate_table(table: &RawTable) -> std::result::Result<TableSummary, ValidationIssue> {
    if table.rows.len() <= MIN_ROWS {
        return Err(ValidationIssue::TooFewRows(table.rows.len()));
    }

    let mut numeric_columns = Vec::new();
    let mut categorical_columns = Vec::new();
    for (index, column) in table.header.iter().enumerate() {
        let mut cells = table
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|cell| !cell.trim().is_empty())
            .peekable();
        let has_cells = cells.peek().is_some();
        if has_cells && cells.all(|cell| is_number(cell.as_str())) {
            numeric_columns.push(column.clone());
        } else {
            categorical_columns.push(column.clone());
        }
    }

    if numeric_columns.is_empty() {
        return Err(ValidationIssue::NoNumericColumn);
    }
    if categorical_columns.is_empty() {
        return Err(ValidationIssue::NoCategoricalColumn);
    }

    Ok(TableSummary {
        rows: table.rows.len(),
        numeric_columns,
        categorical_columns,
    })
}

/// Logs validation problems without rejecting the table.
pub fn check_table(table: &RawTable) -> Option<TableSummary> {
    match validate_table(table) {
        Ok(summary) => Some(summary),
        Err(issue) => {
            warn!("{issue}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn table(header: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(strings(header), rows.iter().map(|r| strings(r)).collect())
    }

    #[test]
    fn resolves_aliases_case_insensitively() {
        let columns = ColumnMap::resolve(&strings(&["Score", "Student", "physics"]));
        assert_eq!(columns.name, 1);
        assert_eq!(columns.primary, 0);
        assert_eq!(columns.subjects, vec![("physics", 2)]);
    }

    #[test]
    fn missing_aliases_fall_back_to_positions() {
        let columns = ColumnMap::resolve(&strings(&["who", "points"]));
        assert_eq!(columns.name, 0);
        assert_eq!(columns.primary, 1);
        assert!(columns.subjects.is_empty());
    }

    #[test]
    fn marks_fallback_skips_the_name_column() {
        let columns = ColumnMap::resolve(&strings(&["points", "student"]));
        assert_eq!(columns.name, 1);
        assert_eq!(columns.primary, 0);

        let dataset = normalize(&table(&["points", "student"], &[&["88", "Alice"]]));
        assert_eq!(dataset.entities()[0].name, "Alice");
        assert_eq!(dataset.entities()[0].primary_score(), 88.0);
    }

    #[test]
    fn subject_columns_need_exact_names() {
        let columns = ColumnMap::resolve(&strings(&["name", "Math", "math"]));
        assert_eq!(columns.subjects, vec![("math", 2)]);
    }

    #[test]
    fn non_numeric_cells_become_zero() {
        assert_eq!(parse_number(" 42.5 "), 42.5);
        assert_eq!(parse_number("absent"), 0.0);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
    }

    #[test]
    fn drops_rows_without_names() {
        let raw = table(
            &["name", "marks"],
            &[&["Alice", "90"], &["", "50"], &["Bob", "n/a"], &[]],
        );
        let dataset = normalize(&raw);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.entities()[1].name, "Bob");
        assert_eq!(dataset.entities()[1].primary_score(), 0.0);
    }

    #[test]
    fn reads_subject_metrics() {
        let raw = table(
            &["name", "math", "biology", "physics"],
            &[&["Alice", "85", "90", "88"]],
        );
        let dataset = normalize(&raw);
        let alice = &dataset.entities()[0];
        assert_eq!(alice.subject("biology"), Some(90.0));
        assert!((alice.primary_score() - 87.6667).abs() < 0.001);
    }

    #[test]
    fn parses_csv_text() {
        let raw = parse_table("name, marks\nAlice, 90\n\nBob,70,extra\n").unwrap();
        assert_eq!(raw.header, strings(&["name", "marks"]));
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[1], strings(&["Bob", "70", "extra"]));
    }

    #[test]
    fn empty_csv_is_an_error() {
        assert!(matches!(parse_table(""), Err(InsightError::EmptyTable)));
    }

    #[test]
    fn validation_requires_enough_rows() {
        let raw = table(&["name", "marks"], &[&["Alice", "90"]]);
        assert_eq!(validate_table(&raw), Err(ValidationIssue::TooFewRows(1)));
    }

    #[test]
    fn validation_splits_column_kinds() {
        let rows: Vec<Vec<String>> = (0..11)
            .map(|i| vec![format!("S{i}"), format!("{}", 50 + i)])
            .collect();
        let raw = RawTable::new(strings(&["name", "marks"]), rows);
        let summary = validate_table(&raw).unwrap();
        assert_eq!(summary.rows, 11);
        assert_eq!(summary.numeric_columns, strings(&["marks"]));
        assert_eq!(summary.categorical_columns, strings(&["name"]));
    }

    #[test]
    fn validation_needs_a_numeric_column() {
        let rows: Vec<Vec<String>> = (0..11).map(|i| vec![format!("S{i}")]).collect();
        let raw = RawTable::new(strings(&["name"]), rows);
        assert_eq!(validate_table(&raw), Err(ValidationIssue::NoNumericColumn));
    }
}
