use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::HeaderValue;

use crate::model::RateLimitUpdate;

/// The bearer credential attached to every request. Set once at startup.
#[derive(Clone)]
pub struct GithubToken {
    secret: String,
}

impl GithubToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn authorization(&self) -> anyhow::Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.secret))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for GithubToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubToken")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limit: i64,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            limit: 5000,
            remaining: 5000,
            reset_at: Utc::now(),
        }
    }

    pub fn update(&mut self, update: RateLimitUpdate) {
        self.limit = update.limit;
        self.remaining = update.remaining;
        self.reset_at = update.reset;
    }

    pub fn consume(&mut self, cost: i64) {
        self.remaining = (self.remaining - cost).max(0);
    }

    /// How long to hold the next request, if the budget is spent and the window has not reset.
    pub fn wait_hint(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.remaining > 0 || self.reset_at <= now {
            return None;
        }
        (self.reset_at - now).to_std().ok()
    }
}
