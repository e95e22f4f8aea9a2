use std::fmt;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::errors::AppError;
use crate::target::Target;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Rejects configurations the collector cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::invalid("github.token must be set"));
        }
        if self.groups.is_empty() {
            return Err(AppError::invalid("at least one group must be configured"));
        }
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(AppError::invalid("group name must be non-empty"));
            }
            if group.targets.is_empty() {
                return Err(AppError::invalid(format!(
                    "group `{}` has an empty target list",
                    group.name
                )));
            }
            if group.output.trim().is_empty() {
                return Err(AppError::invalid(format!(
                    "group `{}` has no output path",
                    group.name
                )));
            }
        }
        self.collector.validate()
    }
}

#[derive(Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_graphql_url")]
    pub graphql_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            user_agent: Self::default_user_agent(),
            graphql_url: Self::default_graphql_url(),
        }
    }
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "closed-issue-collector".to_string()
    }

    fn default_graphql_url() -> String {
        "https://api.github.com/graphql".to_string()
    }
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("graphql_url", &self.graphql_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "CollectorConfig::default_max_items")]
    pub max_items_per_target: i64,
    #[serde(default = "CollectorConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "CollectorConfig::default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "CollectorConfig::default_max_concurrent_targets")]
    pub max_concurrent_targets: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_items_per_target: Self::default_max_items(),
            page_size: Self::default_page_size(),
            page_delay_ms: Self::default_page_delay_ms(),
            max_concurrent_targets: Self::default_max_concurrent_targets(),
            retry: RetryConfig::default(),
        }
    }
}

impl CollectorConfig {
    pub const MAX_PAGE_SIZE: u32 = 100;

    const fn default_max_items() -> i64 {
        200
    }

    const fn default_page_size() -> u32 {
        100
    }

    const fn default_page_delay_ms() -> u64 {
        1000
    }

    const fn default_max_concurrent_targets() -> usize {
        1
    }

    /// The per-target cap as an item count. Call after [`CollectorConfig::validate`].
    pub fn max_items(&self) -> usize {
        usize::try_from(self.max_items_per_target).unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_items_per_target < 0 {
            return Err(AppError::invalid(format!(
                "collector.max_items_per_target must be >= 0, got {}",
                self.max_items_per_target
            )));
        }
        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(AppError::invalid(format!(
                "collector.page_size must be between 1 and {}, got {}",
                Self::MAX_PAGE_SIZE,
                self.page_size
            )));
        }
        if self.max_concurrent_targets == 0 {
            return Err(AppError::invalid(
                "collector.max_concurrent_targets must be >= 1",
            ));
        }
        self.retry.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "RetryConfig::default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "RetryConfig::default_jitter_frac")]
    pub jitter_frac: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            backoff_base_ms: Self::default_backoff_base_ms(),
            backoff_max_ms: Self::default_backoff_max_ms(),
            jitter_frac: Self::default_jitter_frac(),
        }
    }
}

impl RetryConfig {
    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_backoff_base_ms() -> u64 {
        500
    }

    const fn default_backoff_max_ms() -> u64 {
        30_000
    }

    const fn default_jitter_frac() -> f32 {
        0.2
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.max_attempts == 0 {
            return Err(AppError::invalid("collector.retry.max_attempts must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.jitter_frac) {
            return Err(AppError::invalid(
                "collector.retry.jitter_frac must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

/// One popularity group: its targets share a single output table.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub output: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "ObservabilityConfig::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub metrics_path: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            metrics_path: None,
        }
    }
}

impl ObservabilityConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}
