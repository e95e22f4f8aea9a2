use std::fmt;
use std::time::Duration;

use http::StatusCode;

/// A non-success HTTP response returned by GitHub.
#[derive(Debug, Clone)]
pub struct HttpStatusError {
    pub status: StatusCode,
    pub endpoint: String,
    /// Server-advised wait before retrying, from `Retry-After` or an exhausted rate limit.
    pub retry_after: Option<Duration>,
    pub body_preview: String,
}

impl HttpStatusError {
    pub fn new(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self {
            status,
            endpoint: endpoint.into(),
            retry_after: None,
            body_preview: String::new(),
        }
    }

    pub fn with_retry_after(mut self, wait: Option<Duration>) -> Self {
        self.retry_after = wait;
        self
    }

    pub fn with_body_preview(mut self, preview: impl Into<String>) -> Self {
        self.body_preview = preview.into();
        self
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.endpoint.is_empty() {
            write!(f, "unexpected status {}", self.status)?;
        } else {
            write!(f, "unexpected status {} for {}", self.status, self.endpoint)?;
        }
        if !self.body_preview.is_empty() {
            write!(f, ": {}", self.body_preview)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpStatusError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_endpoint_and_preview() {
        let err = HttpStatusError::new(StatusCode::BAD_GATEWAY, "graphql")
            .with_body_preview("upstream down");
        assert_eq!(
            err.to_string(),
            "unexpected status 502 Bad Gateway for graphql: upstream down"
        );
        assert_eq!(
            HttpStatusError::new(StatusCode::UNAUTHORIZED, "").to_string(),
            "unexpected status 401 Unauthorized"
        );
    }
}
