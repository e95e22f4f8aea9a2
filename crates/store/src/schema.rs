use chrono::{DateTime, SecondsFormat, Utc};
use normalizer::IssueRecord;
use serde::Serialize;

/// Column order of the persisted table. The statistics scripts read these names.
pub const COLUMNS: [&str; 6] = [
    "title",
    "createdAt",
    "closedAt",
    "comments",
    "repo",
    "tempo_para_fechamento_dias",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRow<'a> {
    pub title: Option<&'a str>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "closedAt")]
    pub closed_at: Option<String>,
    pub comments: Option<String>,
    pub repo: &'a str,
    pub tempo_para_fechamento_dias: Option<i64>,
}

impl<'a> From<&'a IssueRecord> for IssueRow<'a> {
    fn from(record: &'a IssueRecord) -> Self {
        Self {
            title: record.title.as_deref(),
            created_at: format_timestamp(record.created_at),
            closed_at: record.closed_at.map(format_timestamp),
            comments: if record.comments.is_null() {
                None
            } else {
                Some(record.comments.to_string())
            },
            repo: &record.target_id,
            tempo_para_fechamento_dias: record.closure_duration_days,
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
