use chrono::{DateTime, Utc};

use crate::transform::TimestampError;

/// Why a raw issue could not become an [`crate::IssueRecord`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("issue in {target_id} has no createdAt")]
    MissingCreatedAt { target_id: String },
    #[error("issue in {target_id} has unusable createdAt `{value}`: {source}")]
    InvalidCreatedAt {
        target_id: String,
        value: String,
        #[source]
        source: TimestampError,
    },
    #[error(
        "issue in {target_id} closed at {closed_at} before it was created at {created_at} ({days} days)"
    )]
    AnomalousDuration {
        target_id: String,
        created_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
        days: i64,
    },
}

impl NormalizationError {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::AnomalousDuration { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCreatedAt { .. } => "missing_created_at",
            Self::InvalidCreatedAt { .. } => "invalid_created_at",
            Self::AnomalousDuration { .. } => "negative_duration",
        }
    }
}
