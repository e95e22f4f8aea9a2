use std::sync::Arc;

use async_trait::async_trait;
use common::Target;
use normalizer::RawIssue;

use crate::error::TransportError;

pub mod graphql;

pub use graphql::GraphqlIssueFetcher;

/// Fetches one page of closed issues for a target.
///
/// Implementations do not retry. A `None` cursor requests the first page.
#[async_trait]
pub trait IssueFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        target: &Target,
        cursor: Option<&str>,
    ) -> Result<Page, TransportError>;
}

pub type SharedFetcher = Arc<dyn IssueFetcher>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub issues: Vec<RawIssue>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
    /// Null entries in the response's `nodes` array.
    pub skipped_nodes: usize,
}

impl Page {
    pub fn last(issues: Vec<RawIssue>) -> Self {
        Self {
            issues,
            end_cursor: None,
            has_next_page: false,
            skipped_nodes: 0,
        }
    }

    pub fn with_next(issues: Vec<RawIssue>, cursor: impl Into<String>) -> Self {
        Self {
            issues,
            end_cursor: Some(cursor.into()),
            has_next_page: true,
            skipped_nodes: 0,
        }
    }
}
