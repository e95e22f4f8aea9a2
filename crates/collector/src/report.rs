use std::time::Duration;

use common::Target;
use normalizer::{IssueRecord, NormalizationError};
use serde::Serialize;

use crate::error::TransportError;

/// Everything one target produced. Only built once every page of the target succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetCollection {
    pub records: Vec<IssueRecord>,
    pub dropped: Vec<NormalizationError>,
    /// Issue nodes kept after truncation, before normalization.
    pub fetched: usize,
    /// Null entries the API returned in place of issue nodes.
    pub skipped_nodes: usize,
    pub pages: usize,
}

impl TargetCollection {
    pub fn anomalous(&self) -> usize {
        self.dropped.iter().filter(|err| err.is_anomaly()).count()
    }

    /// Nodes that reached neither the table nor the normalizer's records.
    pub fn excluded(&self) -> usize {
        self.dropped.len() + self.skipped_nodes
    }
}

#[derive(Debug, Clone)]
pub enum CollectionResult {
    Collected(TargetCollection),
    Failed(TransportError),
}

impl CollectionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Collected(_))
    }

    /// Records for a successful target; a failed target contributes nothing.
    pub fn records(&self) -> &[IssueRecord] {
        match self {
            Self::Collected(collection) => &collection.records,
            Self::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&TransportError> {
        match self {
            Self::Collected(_) => None,
            Self::Failed(err) => Some(err),
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Collected(_) => "success",
            Self::Failed(_) => "failure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: Target,
    pub result: CollectionResult,
    pub elapsed: Duration,
}

/// Per-target results of one run, in the order the targets were given.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn records(&self) -> impl Iterator<Item = &IssueRecord> + '_ {
        self.outcomes.iter().flat_map(|o| o.result.records())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransportError> + '_ {
        self.outcomes.iter().filter_map(|o| o.result.error())
    }

    pub fn get(&self, target: &Target) -> Option<&CollectionResult> {
        self.outcomes
            .iter()
            .find(|o| &o.target == target)
            .map(|o| &o.result)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            match &outcome.result {
                CollectionResult::Collected(collection) => {
                    summary.targets_succeeded += 1;
                    summary.records_collected += collection.records.len();
                    summary.records_dropped += collection.excluded();
                    summary.anomalous_durations += collection.anomalous();
                }
                CollectionResult::Failed(_) => summary.targets_failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub targets_succeeded: usize,
    pub targets_failed: usize,
    pub records_collected: usize,
    pub records_dropped: usize,
    pub anomalous_durations: usize,
}
