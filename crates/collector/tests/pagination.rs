mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use collector::{CollectionResult, IssueFetcher, Page, Paginator, TransportCause, TransportError};
use common::Target;
use gh_broker::BackoffPolicy;
use http::StatusCode;
use normalizer::RawIssue;
use serde_json::Value;
use support::{issue, target, ScriptedFetcher};

fn paginator(fetcher: Arc<ScriptedFetcher>) -> Paginator {
    Paginator::new(fetcher)
        .with_page_delay(Duration::ZERO)
        .with_backoff(BackoffPolicy::immediate(3))
}

fn collected(result: CollectionResult) -> collector::TargetCollection {
    match result {
        CollectionResult::Collected(collection) => collection,
        CollectionResult::Failed(err) => panic!("expected success, got {err}"),
    }
}

fn bad_gateway() -> TransportCause {
    TransportCause::Status {
        status: StatusCode::BAD_GATEWAY,
        retry_after: None,
    }
}

#[tokio::test]
async fn follows_cursors_until_last_page() {
    let fetcher = Arc::new(ScriptedFetcher::new().repo("psf/requests", 250, 100));
    let result = paginator(fetcher.clone())
        .collect(&target("psf/requests"), 1000)
        .await;

    let collection = collected(result);
    assert_eq!(collection.records.len(), 250);
    assert_eq!(collection.pages, 3);
    assert_eq!(
        fetcher.cursors_for("psf/requests"),
        vec![None, Some("cursor-1".into()), Some("cursor-2".into())]
    );
    assert!(collection
        .records
        .iter()
        .all(|r| r.target_id == "psf/requests"));
}

#[tokio::test]
async fn truncates_to_cap_preserving_order() {
    let fetcher = Arc::new(ScriptedFetcher::new().repo("pallets/flask", 250, 100));
    let collection = collected(
        paginator(fetcher.clone())
            .collect(&target("pallets/flask"), 150)
            .await,
    );

    assert_eq!(collection.records.len(), 150);
    assert_eq!(collection.fetched, 150);
    assert_eq!(fetcher.calls().len(), 2);
    let titles: Vec<_> = collection
        .records
        .iter()
        .map(|r| r.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles.first().map(String::as_str), Some("Issue 0"));
    assert_eq!(titles.last().map(String::as_str), Some("Issue 149"));
}

#[tokio::test]
async fn reaching_cap_exactly_stops_without_another_request() {
    let fetcher = Arc::new(ScriptedFetcher::new().repo("a/b", 300, 100));
    let collection = collected(paginator(fetcher.clone()).collect(&target("a/b"), 100).await);
    assert_eq!(collection.records.len(), 100);
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn zero_cap_makes_no_requests() {
    let fetcher = Arc::new(ScriptedFetcher::new().repo("a/b", 300, 100));
    let collection = collected(paginator(fetcher.clone()).collect(&target("a/b"), 0).await);
    assert!(collection.records.is_empty());
    assert_eq!(collection.pages, 0);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn empty_repository_succeeds_with_no_records() {
    let fetcher = Arc::new(ScriptedFetcher::new().repo("a/empty", 0, 100));
    let collection = collected(paginator(fetcher.clone()).collect(&target("a/empty"), 200).await);
    assert!(collection.records.is_empty());
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn failure_mid_pagination_discards_earlier_pages() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().repo("a/b", 300, 100).fail(
            "a/b",
            1,
            TransportCause::Status {
                status: StatusCode::UNAUTHORIZED,
                retry_after: None,
            },
            1,
        ),
    );
    let result = paginator(fetcher.clone()).collect(&target("a/b"), 300).await;

    assert!(!result.is_success());
    assert!(result.records().is_empty());
    let err = result.error().expect("failure");
    assert_eq!(err.target, target("a/b"));
    assert_eq!(fetcher.calls().len(), 2);
}

#[tokio::test]
async fn transient_failure_is_retried_then_continues() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .repo("a/b", 300, 100)
            .fail("a/b", 1, bad_gateway(), 2),
    );
    let collection = collected(paginator(fetcher.clone()).collect(&target("a/b"), 300).await);

    assert_eq!(collection.records.len(), 300);
    assert_eq!(
        fetcher.cursors_for("a/b"),
        vec![
            None,
            Some("cursor-1".into()),
            Some("cursor-1".into()),
            Some("cursor-1".into()),
            Some("cursor-2".into()),
        ]
    );
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .repo("a/b", 300, 100)
            .fail("a/b", 1, bad_gateway(), 5),
    );
    let result = paginator(fetcher.clone()).collect(&target("a/b"), 300).await;

    let err = result.error().expect("failure");
    assert!(err.cause.is_transient());
    assert_eq!(fetcher.cursors_for("a/b").len(), 1 + 3);
}

#[tokio::test]
async fn single_attempt_policy_never_retries() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .repo("a/b", 100, 100)
            .fail("a/b", 0, bad_gateway(), 1),
    );
    let result = Paginator::new(fetcher.clone())
        .with_page_delay(Duration::ZERO)
        .with_backoff(BackoffPolicy::no_retry())
        .collect(&target("a/b"), 100)
        .await;
    assert!(!result.is_success());
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn missing_repository_is_not_retried() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let result = paginator(fetcher.clone()).collect(&target("gone/away"), 100).await;

    assert_eq!(
        result.error().map(|e| e.cause.clone()),
        Some(TransportCause::RepositoryNotFound)
    );
    assert_eq!(fetcher.calls().len(), 1);
}

struct StuckCursor;

#[async_trait]
impl IssueFetcher for StuckCursor {
    async fn fetch_page(
        &self,
        _target: &Target,
        _cursor: Option<&str>,
    ) -> Result<Page, TransportError> {
        Ok(Page::with_next(vec![issue(1)], "same"))
    }
}

#[tokio::test]
async fn cursor_that_does_not_advance_is_malformed() {
    let result = Paginator::new(Arc::new(StuckCursor))
        .with_page_delay(Duration::ZERO)
        .collect(&target("a/b"), 1000)
        .await;
    assert_eq!(result.error().map(|e| e.cause.label()), Some("malformed"));
}

#[derive(Default)]
struct EndlessEmptyPages {
    calls: AtomicUsize,
}

#[async_trait]
impl IssueFetcher for EndlessEmptyPages {
    async fn fetch_page(
        &self,
        _target: &Target,
        _cursor: Option<&str>,
    ) -> Result<Page, TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Page::with_next(vec![], format!("c{n}")))
    }
}

#[tokio::test]
async fn empty_page_claiming_more_pages_is_malformed() {
    let fetcher = Arc::new(EndlessEmptyPages::default());
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        Paginator::new(fetcher.clone())
            .with_page_delay(Duration::ZERO)
            .collect(&target("a/b"), 200),
    )
    .await
    .expect("pagination terminates");
    assert_eq!(result.error().map(|e| e.cause.label()), Some("malformed"));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delay_is_only_applied_between_pages() {
    let single = Arc::new(ScriptedFetcher::new().repo("a/one", 10, 100));
    let started = Instant::now();
    Paginator::new(single)
        .with_page_delay(Duration::from_millis(500))
        .collect(&target("a/one"), 100)
        .await;
    assert!(started.elapsed() < Duration::from_millis(500));

    let three = Arc::new(ScriptedFetcher::new().repo("a/three", 30, 10));
    let started = Instant::now();
    Paginator::new(three)
        .with_page_delay(Duration::from_millis(20))
        .collect(&target("a/three"), 100)
        .await;
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn unusable_nodes_are_counted_not_written() {
    let negative = RawIssue {
        title: Some("Closed before opened".into()),
        created_at: Some("2023-03-10T00:00:00Z".into()),
        closed_at: Some("2023-03-01T00:00:00Z".into()),
        comments: Value::Null,
    };
    let missing = RawIssue {
        title: Some("No dates".into()),
        ..RawIssue::default()
    };
    let fetcher = Arc::new(
        ScriptedFetcher::new().pages("a/b", vec![vec![issue(3), negative, missing]]),
    );
    let collection = collected(paginator(fetcher).collect(&target("a/b"), 100).await);

    assert_eq!(collection.fetched, 3);
    assert_eq!(collection.records.len(), 1);
    assert_eq!(collection.dropped.len(), 2);
    assert_eq!(collection.anomalous(), 1);
    assert_eq!(collection.records[0].closure_duration_days, Some(4));
    assert_eq!(collection.records[0].comment_count, Some(3));
}

#[tokio::test]
async fn null_nodes_are_counted_as_excluded() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .repo("a/b", 20, 10)
            .nulls("a/b", 0, 2)
            .nulls("a/b", 1, 1),
    );
    let collection = collected(paginator(fetcher).collect(&target("a/b"), 100).await);

    assert_eq!(collection.records.len(), 20);
    assert_eq!(collection.skipped_nodes, 3);
    assert_eq!(collection.excluded(), 3);
}
