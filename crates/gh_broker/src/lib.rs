pub mod backoff;
pub mod broker;
pub mod error;
pub mod metrics;
pub mod model;
pub mod token;

pub use backoff::BackoffPolicy;
pub use broker::{GithubBroker, GithubBrokerBuilder, HttpExec, ReqwestExecutor};
pub use error::HttpStatusError;
pub use token::{GithubToken, RateLimitState};
