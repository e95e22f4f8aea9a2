#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use collector::{IssueFetcher, Page, TransportCause, TransportError};
use common::Target;
use normalizer::RawIssue;
use serde_json::json;

pub fn target(id: &str) -> Target {
    id.parse().expect("valid target")
}

/// A closed issue whose duration is `n % 27 + 1` days and comment count is `n`.
pub fn issue(n: usize) -> RawIssue {
    RawIssue {
        title: Some(format!("Issue {n}")),
        created_at: Some("2023-01-01T00:00:00Z".into()),
        closed_at: Some(format!("2023-01-{:02}T00:00:00Z", 2 + n % 27)),
        comments: json!({ "totalCount": n }),
    }
}

pub fn issues(count: usize) -> Vec<RawIssue> {
    (0..count).map(issue).collect()
}

#[derive(Default)]
struct Script {
    pages: Vec<Vec<RawIssue>>,
    failures: HashMap<usize, VecDeque<TransportCause>>,
    null_nodes: HashMap<usize, usize>,
    delay: Option<Duration>,
}

/// Serves pre-built pages keyed by target. Cursors are `cursor-<page index>`.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo(self, id: &str, total: usize, page_size: usize) -> Self {
        let all = issues(total);
        let mut pages: Vec<Vec<RawIssue>> = all.chunks(page_size).map(<[RawIssue]>::to_vec).collect();
        if pages.is_empty() {
            pages.push(Vec::new());
        }
        self.pages(id, pages)
    }

    pub fn pages(self, id: &str, pages: Vec<Vec<RawIssue>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .pages = pages;
        self
    }

    /// Fails the fetch of page `page` with `cause` for the next `times` attempts.
    pub fn fail(self, id: &str, page: usize, cause: TransportCause, times: usize) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .failures
            .entry(page)
            .or_default()
            .extend(std::iter::repeat(cause).take(times));
        self
    }

    /// Reports `count` null nodes alongside the issues of page `page`.
    pub fn nulls(self, id: &str, page: usize, count: usize) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .null_nodes
            .insert(page, count);
        self
    }

    pub fn slow(self, id: &str, delay: Duration) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cursors_for(&self, id: &str) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter(|(called, _)| called == id)
            .map(|(_, cursor)| cursor)
            .collect()
    }
}

#[async_trait]
impl IssueFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        target: &Target,
        cursor: Option<&str>,
    ) -> Result<Page, TransportError> {
        let id = target.id();
        self.calls
            .lock()
            .unwrap()
            .push((id.clone(), cursor.map(str::to_string)));

        let delay = self.scripts.lock().unwrap().get(&id).and_then(|s| s.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(&id) else {
            return Err(TransportError::new(target, TransportCause::RepositoryNotFound));
        };
        let index = match cursor {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix("cursor-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| {
                    TransportError::new(target, TransportCause::malformed("unknown cursor"))
                })?,
        };
        if let Some(cause) = script.failures.get_mut(&index).and_then(VecDeque::pop_front) {
            return Err(TransportError::new(target, cause));
        }

        let issues = script.pages.get(index).cloned().unwrap_or_default();
        let has_next_page = index + 1 < script.pages.len();
        Ok(Page {
            issues,
            end_cursor: has_next_page.then(|| format!("cursor-{}", index + 1)),
            has_next_page,
            skipped_nodes: script.null_nodes.get(&index).copied().unwrap_or(0),
        })
    }
}
