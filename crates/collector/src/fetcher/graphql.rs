use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use common::Target;
use gh_broker::GithubBroker;
use http::{header, Request};
use normalizer::RawIssue;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::{TransportCause, TransportError};
use crate::fetcher::{IssueFetcher, Page};
use crate::metrics;

const ISSUES_QUERY: &str = r#"
query ClosedIssues($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issues(
      first: $pageSize,
      after: $cursor,
      states: CLOSED,
      orderBy: { field: CREATED_AT, direction: DESC }
    ) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        title
        createdAt
        closedAt
        comments { totalCount }
      }
    }
  }
}
"#;

pub struct GraphqlIssueFetcher {
    broker: Arc<dyn GithubBroker>,
    endpoint: String,
    page_size: u32,
}

impl GraphqlIssueFetcher {
    pub fn new(broker: Arc<dyn GithubBroker>, endpoint: &str, page_size: u32) -> Result<Self> {
        let url = Url::parse(endpoint).with_context(|| format!("invalid graphql url `{endpoint}`"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("graphql url must be http(s), got `{endpoint}`");
        }
        Ok(Self {
            broker,
            endpoint: url.to_string(),
            page_size,
        })
    }

    fn build_request(&self, target: &Target, cursor: Option<&str>) -> Result<Request<Vec<u8>>> {
        let payload = json!({
            "query": ISSUES_QUERY,
            "variables": {
                "owner": target.owner,
                "name": target.name,
                "pageSize": self.page_size,
                "cursor": cursor,
            },
        });
        Ok(Request::builder()
            .method("POST")
            .uri(self.endpoint.as_str())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&payload)?)?)
    }

    async fn execute(&self, target: &Target, cursor: Option<&str>) -> Result<Page, TransportCause> {
        let request = self
            .build_request(target, cursor)
            .map_err(|err| TransportCause::Network {
                message: format!("building request: {err:#}"),
            })?;
        let response = self
            .broker
            .enqueue(request)
            .await
            .map_err(|err| TransportCause::from_broker(&err))?;
        parse_page(response.body())
    }
}

#[async_trait]
impl IssueFetcher for GraphqlIssueFetcher {
    async fn fetch_page(
        &self,
        target: &Target,
        cursor: Option<&str>,
    ) -> Result<Page, TransportError> {
        let start = Instant::now();
        let result = self.execute(target, cursor).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(cause) => cause.label(),
        };
        metrics::FETCH_REQUESTS_TOTAL
            .with_label_values(&[outcome])
            .inc();
        metrics::FETCH_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        let page = result.map_err(|cause| TransportError::new(target, cause))?;
        debug!(
            repo = %target,
            cursor,
            issues = page.issues.len(),
            has_next_page = page.has_next_page,
            "fetched issue page"
        );
        Ok(page)
    }
}

/// Decodes one GraphQL response body into a page.
pub fn parse_page(body: &[u8]) -> Result<Page, TransportCause> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| TransportCause::malformed(format!("invalid json: {err}")))?;

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(map_graphql_errors(errors));
        }
    }

    let repository = value
        .get("data")
        .and_then(|d| d.get("repository"))
        .ok_or_else(|| TransportCause::malformed("missing repository field"))?;
    if repository.is_null() {
        return Err(TransportCause::RepositoryNotFound);
    }
    let issues = repository
        .get("issues")
        .filter(|v| v.is_object())
        .ok_or_else(|| TransportCause::malformed("missing issues connection"))?;
    let nodes = issues
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| TransportCause::malformed("missing issues.nodes"))?;

    let page_info = issues
        .get("pageInfo")
        .filter(|v| v.is_object())
        .ok_or_else(|| TransportCause::malformed("missing issues.pageInfo"))?;
    let has_next_page = page_info
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .ok_or_else(|| TransportCause::malformed("pageInfo.hasNextPage is not a boolean"))?;
    let end_cursor = page_info
        .get("endCursor")
        .and_then(Value::as_str)
        .map(str::to_string);
    if has_next_page && end_cursor.is_none() {
        return Err(TransportCause::malformed(
            "hasNextPage is true but endCursor is missing",
        ));
    }

    let issues: Vec<RawIssue> = nodes
        .iter()
        .filter(|n| !n.is_null())
        .map(RawIssue::from_node)
        .collect();
    Ok(Page {
        skipped_nodes: nodes.len() - issues.len(),
        issues,
        end_cursor,
        has_next_page,
    })
}

fn map_graphql_errors(errors: &[Value]) -> TransportCause {
    let Some(first) = errors.first() else {
        return TransportCause::Graphql {
            message: "unknown GraphQL error".into(),
            kind: String::new(),
        };
    };
    let message = first
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown GraphQL error");
    let kind = first
        .get("type")
        .or_else(|| first.get("extensions").and_then(|ext| ext.get("code")))
        .and_then(Value::as_str)
        .unwrap_or("");
    if kind == "NOT_FOUND" {
        return TransportCause::RepositoryNotFound;
    }
    TransportCause::Graphql {
        message: message.to_string(),
        kind: kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    #[test]
    fn parses_nodes_and_page_info() {
        let page = parse_page(&body(json!({
            "data": {"repository": {"issues": {
                "pageInfo": {"hasNextPage": true, "endCursor": "Y3Vyc29yOjE="},
                "nodes": [
                    {"title": "Crash", "createdAt": "2023-01-01T00:00:00Z",
                     "closedAt": "2023-01-05T00:00:00Z", "comments": {"totalCount": 3}},
                    null
                ]
            }}}
        })))
        .unwrap();
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.skipped_nodes, 1);
        assert_eq!(page.issues[0].title.as_deref(), Some("Crash"));
        assert_eq!(page.end_cursor.as_deref(), Some("Y3Vyc29yOjE="));
        assert!(page.has_next_page);
    }

    #[test]
    fn null_repository_is_not_found() {
        let err = parse_page(&body(json!({"data": {"repository": null}}))).unwrap_err();
        assert_eq!(err, TransportCause::RepositoryNotFound);
    }

    #[test]
    fn not_found_error_type_is_not_found() {
        let err = parse_page(&body(json!({
            "data": {"repository": null},
            "errors": [{"type": "NOT_FOUND", "message": "Could not resolve to a Repository"}]
        })))
        .unwrap_err();
        assert_eq!(err, TransportCause::RepositoryNotFound);
    }

    #[test]
    fn rate_limited_error_is_transient() {
        let err = parse_page(&body(json!({
            "errors": [{"type": "RATE_LIMITED", "message": "API rate limit exceeded"}]
        })))
        .unwrap_err();
        assert!(matches!(err, TransportCause::Graphql { ref kind, .. } if kind == "RATE_LIMITED"));
        assert!(err.is_transient());
    }

    #[test]
    fn missing_cursor_with_next_page_is_malformed() {
        let err = parse_page(&body(json!({
            "data": {"repository": {"issues": {
                "pageInfo": {"hasNextPage": true, "endCursor": null},
                "nodes": []
            }}}
        })))
        .unwrap_err();
        assert_eq!(err.label(), "malformed");
    }

    #[test]
    fn null_nodes_are_counted_as_skipped() {
        let page = parse_page(&body(json!({
            "data": {"repository": {"issues": {
                "pageInfo": {"hasNextPage": false, "endCursor": null},
                "nodes": [null, null, {"title": "Kept", "createdAt": "2023-01-01T00:00:00Z"}]
            }}}
        })))
        .unwrap();
        assert_eq!(page.issues.len(), 1);
        assert_eq!(page.skipped_nodes, 2);
    }

    #[test]
    fn missing_page_info_is_malformed() {
        let err = parse_page(&body(json!({
            "data": {"repository": {"issues": {"nodes": []}}}
        })))
        .unwrap_err();
        assert_eq!(err.label(), "malformed");

        let err = parse_page(&body(json!({
            "data": {"repository": {"issues": {
                "pageInfo": {"hasNextPage": "yes", "endCursor": "abc"},
                "nodes": []
            }}}
        })))
        .unwrap_err();
        assert_eq!(err.label(), "malformed");
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert_eq!(parse_page(b"<html>").unwrap_err().label(), "malformed");
        assert_eq!(
            parse_page(&body(json!({"data": {}}))).unwrap_err().label(),
            "malformed"
        );
    }
}
