use std::time::Duration;

use common::config::{CollectorConfig, RetryConfig};
use common::Target;
use gh_broker::BackoffPolicy;
use normalizer::normalize_batch;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::{TransportCause, TransportError};
use crate::fetcher::{Page, SharedFetcher};
use crate::metrics;
use crate::report::{CollectionResult, TargetCollection};

const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

pub fn backoff_from_config(retry: &RetryConfig) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts: retry.max_attempts.max(1),
        base: Duration::from_millis(retry.backoff_base_ms),
        max: Duration::from_millis(retry.backoff_max_ms),
        jitter_frac: retry.jitter_frac,
    }
}

/// Walks the issue pages of one target up to a cap.
///
/// A target's result is all or nothing: any page that still fails after its retries discards
/// the pages gathered before it. Every page that claims a successor must carry at least one
/// issue, so a target never takes more than `max_items` fetches.
pub struct Paginator {
    fetcher: SharedFetcher,
    page_delay: Duration,
    backoff: BackoffPolicy,
}

impl Paginator {
    pub fn new(fetcher: SharedFetcher) -> Self {
        Self {
            fetcher,
            page_delay: DEFAULT_PAGE_DELAY,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn from_config(config: &CollectorConfig, fetcher: SharedFetcher) -> Self {
        Self::new(fetcher)
            .with_page_delay(Duration::from_millis(config.page_delay_ms))
            .with_backoff(backoff_from_config(&config.retry))
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[instrument(skip(self, target), fields(repo = %target))]
    pub async fn collect(&self, target: &Target, max_items: usize) -> CollectionResult {
        if max_items == 0 {
            return CollectionResult::Collected(TargetCollection::default());
        }

        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut skipped_nodes = 0usize;
        loop {
            let page = match self.fetch_with_retry(target, cursor.as_deref()).await {
                Ok(page) => page,
                Err(err) => {
                    warn!(pages, error = %err, "abandoning target; partial pages discarded");
                    return CollectionResult::Failed(err);
                }
            };
            pages += 1;
            metrics::PAGES_FETCHED_TOTAL.inc();

            let Page {
                issues,
                end_cursor,
                has_next_page,
                skipped_nodes: skipped,
            } = page;
            skipped_nodes += skipped;
            if has_next_page && issues.is_empty() {
                return CollectionResult::Failed(TransportError::new(
                    target,
                    TransportCause::malformed("page without issues claims a next page"),
                ));
            }
            nodes.extend(issues);
            if nodes.len() >= max_items {
                nodes.truncate(max_items);
                break;
            }
            if !has_next_page {
                break;
            }
            let next = match end_cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => next,
                Some(_) => {
                    return CollectionResult::Failed(TransportError::new(
                        target,
                        TransportCause::malformed("endCursor did not advance"),
                    ))
                }
                None => {
                    return CollectionResult::Failed(TransportError::new(
                        target,
                        TransportCause::malformed("hasNextPage is true but endCursor is missing"),
                    ))
                }
            };
            cursor = Some(next);
            if !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }
        }

        metrics::ISSUES_FETCHED_TOTAL.inc_by(nodes.len() as u64);
        let batch = normalize_batch(&nodes, &target.id());
        for dropped in &batch.dropped {
            metrics::RECORDS_DROPPED_TOTAL
                .with_label_values(&[dropped.reason()])
                .inc();
        }
        if skipped_nodes > 0 {
            metrics::RECORDS_DROPPED_TOTAL
                .with_label_values(&["null_node"])
                .inc_by(skipped_nodes as u64);
        }
        debug!(
            pages,
            fetched = nodes.len(),
            records = batch.records.len(),
            dropped = batch.dropped.len(),
            skipped_nodes,
            "target paginated"
        );
        CollectionResult::Collected(TargetCollection {
            records: batch.records,
            dropped: batch.dropped,
            fetched: nodes.len(),
            skipped_nodes,
            pages,
        })
    }

    async fn fetch_with_retry(
        &self,
        target: &Target,
        cursor: Option<&str>,
    ) -> Result<Page, TransportError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.fetcher.fetch_page(target, cursor).await {
                Ok(page) => return Ok(page),
                Err(err) if err.cause.is_transient() && self.backoff.allows_retry(attempts) => {
                    let delay = self.backoff.delay(attempts, err.cause.retry_after());
                    metrics::FETCH_RETRIES_TOTAL
                        .with_label_values(&[err.cause.label()])
                        .inc();
                    warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err.cause,
                        "transient fetch failure; retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
