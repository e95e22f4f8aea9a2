use std::path::Path;

use normalizer::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AnalysisError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Columns the analysis reads; the rest of the table is ignored.
pub const READ_COLUMNS: [&str; 4] = ["title", "createdAt", "closedAt", "comments"];

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(rename = "closedAt", default)]
    closed_at: Option<String>,
    #[serde(default)]
    comments: Option<String>,
}

/// One table row with its derived values. Durations are recomputed from the timestamps rather
/// than trusted from the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRow {
    pub title: Option<String>,
    /// Whole days to close; absent when either timestamp is unusable or the span is negative.
    pub closure_days: Option<i64>,
    pub comment_count: Option<i64>,
    pub negative_duration: bool,
}

impl AnalysisRow {
    pub fn new(title: Option<&str>, created: &str, closed: &str, comments: &str) -> Self {
        let span = parse_timestamp(created)
            .ok()
            .zip(parse_timestamp(closed).ok())
            .map(|(created, closed)| (closed - created).num_seconds().div_euclid(SECONDS_PER_DAY));
        Self {
            title: title.map(str::to_string),
            closure_days: span.filter(|days| *days >= 0),
            comment_count: parse_comment_count(comments),
            negative_duration: span.is_some_and(|days| days < 0),
        }
    }
}

impl From<TableRow> for AnalysisRow {
    fn from(row: TableRow) -> Self {
        Self::new(
            row.title.as_deref(),
            row.created_at.as_deref().unwrap_or_default(),
            row.closed_at.as_deref().unwrap_or_default(),
            row.comments.as_deref().unwrap_or_default(),
        )
    }
}

/// Reads `totalCount` from a comments cell written either as JSON or as a Python dict literal.
pub fn parse_comment_count(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(cell)
        .or_else(|_| serde_json::from_str(&cell.replace('\'', "\"")))
        .ok()?;
    value
        .get("totalCount")?
        .as_i64()
        .filter(|count| *count >= 0)
}

pub fn load_table(path: &Path) -> Result<Vec<AnalysisRow>, AnalysisError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| AnalysisError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let headers = reader
        .headers()
        .map_err(|source| AnalysisError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    if let Some(column) = READ_COLUMNS
        .into_iter()
        .find(|column| !headers.iter().any(|h| h == *column))
    {
        return Err(AnalysisError::MissingColumn {
            path: path.to_path_buf(),
            column,
        });
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, record) in reader.deserialize::<TableRow>().enumerate() {
        match record {
            Ok(row) => rows.push(AnalysisRow::from(row)),
            Err(err) => {
                skipped += 1;
                debug!(path = %path.display(), row = index + 1, error = %err, "skipping row");
            }
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped unreadable rows");
    }
    Ok(rows)
}
