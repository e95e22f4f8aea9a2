use std::time::Duration;

pub fn exponential_jitter_backoff(
    base: Duration,
    attempt: u32,
    max: Duration,
    jitter_frac: f32,
) -> Duration {
    let capped_attempt = attempt.min(8);
    let factor = 1u32 << capped_attempt;
    let capped = base.saturating_mul(factor).min(max);
    let nanos = capped.as_nanos() as i128;
    let jitter = ((nanos as f64) * f64::from(jitter_frac.clamp(0.0, 1.0))).round() as i128;
    let delta = if jitter > 0 {
        fastrand::i128(-jitter..=jitter)
    } else {
        0
    };
    let result = (nanos + delta).max(0);
    Duration::from_nanos(u64::try_from(result).unwrap_or(u64::MAX))
}

/// Retry schedule for failed GitHub requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
    pub jitter_frac: f32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
            jitter_frac: 0.2,
        }
    }
}

impl BackoffPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base: Duration::ZERO,
            max: Duration::ZERO,
            jitter_frac: 0.0,
        }
    }

    /// Delay before retry number `retry` (1-based), raised to `advised` when the server asked
    /// for a longer wait.
    pub fn delay(&self, retry: u32, advised: Option<Duration>) -> Duration {
        let computed =
            exponential_jitter_backoff(self.base, retry.saturating_sub(1), self.max, self.jitter_frac);
        match advised {
            Some(wait) if wait > computed => wait,
            _ => computed,
        }
    }

    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
