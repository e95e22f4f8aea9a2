use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NormalizationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Whole days between creation and close; present only when both timestamps parsed.
    pub closure_duration_days: Option<i64>,
    pub comment_count: Option<i64>,
    /// The untouched `comments` payload, persisted for downstream re-parsing.
    pub comments: serde_json::Value,
    pub target_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<IssueRecord>,
    pub dropped: Vec<NormalizationError>,
}

impl NormalizedBatch {
    pub fn anomalous(&self) -> usize {
        self.dropped.iter().filter(|err| err.is_anomaly()).count()
    }

    pub fn invalid(&self) -> usize {
        self.dropped.len() - self.anomalous()
    }
}
