use std::time::Duration;

use common::Target;
use gh_broker::HttpStatusError;
use http::StatusCode;
use thiserror::Error;

/// A page fetch that did not produce a page.
#[derive(Debug, Clone, Error)]
#[error("fetching {target}: {cause}")]
pub struct TransportError {
    pub target: Target,
    #[source]
    pub cause: TransportCause,
}

impl TransportError {
    pub fn new(target: &Target, cause: TransportCause) -> Self {
        Self {
            target: target.clone(),
            cause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportCause {
    #[error("github returned {status}")]
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
    },
    #[error("graphql error ({kind}): {message}")]
    Graphql { message: String, kind: String },
    #[error("repository not found")]
    RepositoryNotFound,
    #[error("malformed response: {reason}")]
    Malformed { reason: String },
    #[error("network error: {message}")]
    Network { message: String },
}

impl TransportCause {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Classifies a broker failure: HTTP statuses keep their code, everything else is network.
    pub fn from_broker(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<HttpStatusError>() {
            Some(http) if http.status == StatusCode::NOT_FOUND => Self::RepositoryNotFound,
            Some(http) => Self::Status {
                status: http.status,
                retry_after: http.retry_after,
            },
            None => Self::Network {
                message: format!("{err:#}"),
            },
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::FORBIDDEN
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Graphql { kind, .. } => kind == "RATE_LIMITED",
            Self::Network { .. } => true,
            Self::RepositoryNotFound | Self::Malformed { .. } => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Graphql { .. } => "graphql",
            Self::RepositoryNotFound => "not_found",
            Self::Malformed { .. } => "malformed",
            Self::Network { .. } => "network",
        }
    }
}
