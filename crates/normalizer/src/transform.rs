use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::NormalizationError;
use crate::models::{IssueRecord, NormalizedBatch};
use crate::payloads::RawIssue;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp has no UTC offset")]
    Naive,
    #[error("{0}")]
    Invalid(String),
}

/// Parses an RFC 3339 timestamp. Values without an offset are rejected instead of being
/// assumed UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let value = value.trim();
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(err) => {
            let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok());
            if naive {
                Err(TimestampError::Naive)
            } else {
                Err(TimestampError::Invalid(err.to_string()))
            }
        }
    }
}

pub fn normalize(raw: &RawIssue, target_id: &str) -> Result<IssueRecord, NormalizationError> {
    let created_value =
        raw.created_at
            .as_deref()
            .ok_or_else(|| NormalizationError::MissingCreatedAt {
                target_id: target_id.to_string(),
            })?;
    let created_at =
        parse_timestamp(created_value).map_err(|source| NormalizationError::InvalidCreatedAt {
            target_id: target_id.to_string(),
            value: created_value.to_string(),
            source,
        })?;

    let closed_at = raw.closed_at.as_deref().and_then(|value| {
        parse_timestamp(value)
            .map_err(|err| {
                warn!(
                    target_id,
                    value,
                    error = %err,
                    "ignoring unparsable closedAt"
                );
            })
            .ok()
    });

    let closure_duration_days = match closed_at {
        Some(closed) => {
            let days = (closed - created_at)
                .num_seconds()
                .div_euclid(SECONDS_PER_DAY);
            if closed < created_at {
                return Err(NormalizationError::AnomalousDuration {
                    target_id: target_id.to_string(),
                    created_at,
                    closed_at: closed,
                    days,
                });
            }
            Some(days)
        }
        None => None,
    };

    Ok(IssueRecord {
        title: raw.title.clone(),
        created_at,
        closed_at,
        closure_duration_days,
        comment_count: comment_count(&raw.comments),
        comments: raw.comments.clone(),
        target_id: target_id.to_string(),
    })
}

fn comment_count(comments: &Value) -> Option<i64> {
    comments
        .as_object()?
        .get("totalCount")?
        .as_i64()
        .filter(|count| *count >= 0)
}

/// Normalizes every node of one target, keeping the failures for the run summary.
pub fn normalize_batch(raws: &[RawIssue], target_id: &str) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        records: Vec::with_capacity(raws.len()),
        dropped: Vec::new(),
    };
    for raw in raws {
        match normalize(raw, target_id) {
            Ok(record) => batch.records.push(record),
            Err(err) => {
                if err.is_anomaly() {
                    warn!(target_id, error = %err, "excluding issue with negative closure time");
                } else {
                    debug!(target_id, error = %err, "dropping unparsable issue");
                }
                batch.dropped.push(err);
            }
        }
    }
    batch
}
