use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use http::{header, HeaderValue, Request, Response, StatusCode};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::HttpStatusError;
use crate::metrics;
use crate::model::{body_preview, parse_rate_limit, parse_retry_after};
use crate::token::{GithubToken, RateLimitState};

#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let mut builder = self.client.request(parts.method, parts.uri.to_string());
        builder = builder.headers(parts.headers);
        let resp = builder.body(body).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let mut response = Response::builder().status(status).body(bytes.to_vec())?;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Executes authenticated GitHub requests. Implementations never retry; a non-success status
/// comes back as an [`HttpStatusError`].
pub trait GithubBroker: Send + Sync {
    fn enqueue(
        &self,
        request: Request<Vec<u8>>,
    ) -> futures::future::BoxFuture<'static, Result<Response<Vec<u8>>>>;
}

#[derive(Clone)]
pub struct GithubBrokerBuilder {
    token: GithubToken,
    user_agent: String,
    http_exec: Option<Arc<dyn HttpExec>>,
    max_inflight: usize,
}

impl GithubBrokerBuilder {
    pub fn new(token: GithubToken) -> Self {
        Self {
            token,
            user_agent: "closed-issue-collector".to_string(),
            http_exec: None,
            max_inflight: 4,
        }
    }

    pub fn http_exec(mut self, exec: Arc<dyn HttpExec>) -> Self {
        self.http_exec = Some(exec);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn max_inflight(mut self, max: usize) -> Self {
        self.max_inflight = max.max(1);
        self
    }

    pub fn build(self) -> Result<Arc<dyn GithubBroker>> {
        let exec = match self.http_exec {
            Some(exec) => exec,
            None => Arc::new(ReqwestExecutor::new(&self.user_agent)?),
        };

        let inner = Arc::new(Inner {
            http_exec: exec,
            authorization: self.token.authorization()?,
            user_agent: HeaderValue::from_str(&self.user_agent)?,
            rate: Mutex::new(RateLimitState::new()),
            inflight: Arc::new(Semaphore::new(self.max_inflight)),
        });

        Ok(Arc::new(LocalGithubBroker { inner }))
    }
}

struct Inner {
    http_exec: Arc<dyn HttpExec>,
    authorization: HeaderValue,
    user_agent: HeaderValue,
    rate: Mutex<RateLimitState>,
    inflight: Arc<Semaphore>,
}

impl Inner {
    async fn wait_for_budget(&self) {
        let wait = {
            let guard = self.rate.lock().await;
            guard.wait_hint(Utc::now())
        };
        if let Some(wait) = wait {
            warn!(
                wait_seconds = wait.as_secs(),
                "rate limit exhausted, waiting for reset"
            );
            metrics::SLEEP_SECONDS
                .with_label_values(&["rate_limit"])
                .inc_by(wait.as_secs());
            sleep(wait + Duration::from_secs(1)).await;
        }
    }

    async fn record_rate_limit(&self, headers: &http::HeaderMap) {
        let mut guard = self.rate.lock().await;
        match parse_rate_limit(headers) {
            Some(update) => guard.update(update),
            None => guard.consume(1),
        }
        metrics::RATE_LIMIT.set(guard.limit);
        metrics::RATE_REMAINING.set(guard.remaining);
    }

    async fn exhausted_wait(&self) -> Option<Duration> {
        let guard = self.rate.lock().await;
        guard.wait_hint(Utc::now())
    }

    async fn execute(&self, mut request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let _permit = self.inflight.clone().acquire_owned().await?;
        self.wait_for_budget().await;

        let headers = request.headers_mut();
        headers.insert(header::AUTHORIZATION, self.authorization.clone());
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, self.user_agent.clone());
        }
        let endpoint = request.uri().path().trim_start_matches('/').to_string();

        debug!(endpoint = %endpoint, method = %request.method(), "dispatching GitHub request");
        metrics::INFLIGHT.inc();
        let start = Instant::now();
        let response = self.http_exec.execute(request).await;
        metrics::INFLIGHT.dec();
        metrics::LATENCY.observe(start.elapsed().as_secs_f64());

        let response = match response {
            Ok(resp) => resp,
            Err(err) => {
                metrics::REQUESTS_TOTAL
                    .with_label_values(&["network_error"])
                    .inc();
                return Err(err);
            }
        };

        let status = response.status();
        metrics::REQUESTS_TOTAL
            .with_label_values(&[status_class(status)])
            .inc();
        self.record_rate_limit(response.headers()).await;

        if status.is_success() {
            return Ok(response);
        }

        let advised = match parse_retry_after(response.headers()) {
            Some(wait) => Some(wait),
            None if status == StatusCode::FORBIDDEN
                || status == StatusCode::TOO_MANY_REQUESTS =>
            {
                self.exhausted_wait().await
            }
            None => None,
        };
        let preview = body_preview(response.body());
        warn!(
            status = %status,
            endpoint = %endpoint,
            github_request_id = response
                .headers()
                .get("x-github-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-"),
            retry_after_seconds = advised.map(|wait| wait.as_secs()),
            body_preview = %preview,
            "GitHub returned error response"
        );
        Err(HttpStatusError::new(status, endpoint)
            .with_retry_after(advised)
            .with_body_preview(preview)
            .into())
    }
}

#[derive(Clone)]
pub struct LocalGithubBroker {
    inner: Arc<Inner>,
}

impl GithubBroker for LocalGithubBroker {
    fn enqueue(
        &self,
        request: Request<Vec<u8>>,
    ) -> futures::future::BoxFuture<'static, Result<Response<Vec<u8>>>> {
        let inner = self.inner.clone();
        async move {
            if request.uri().host().is_none() {
                return Err(anyhow!("request uri must be absolute: {}", request.uri()));
            }
            inner.execute(request).await
        }
        .boxed()
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
