use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

pub static RUNS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_runs_total",
        "Total number of collection runs started"
    )
    .expect("collector runs total")
});

pub static LAST_RUN_TIMESTAMP: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "collector_last_run_timestamp_seconds",
        "Unix timestamp when the last collection run started"
    )
    .expect("collector last run timestamp")
});

pub static ACTIVE_TARGETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "collector_active_targets",
        "Number of targets currently being paginated"
    )
    .expect("collector active targets gauge")
});

pub static TARGETS_PROCESSED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_targets_processed_total",
        "Targets processed grouped by outcome",
        &["outcome"]
    )
    .expect("collector targets processed")
});

pub static TARGET_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "collector_target_duration_seconds",
        "Time spent collecting one target grouped by outcome",
        &["outcome"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .expect("collector target duration histogram")
});

pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "collector_run_duration_seconds",
        "Duration of collection runs in seconds",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0]
    )
    .expect("collector run duration histogram")
});

pub static PAGES_FETCHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_pages_fetched_total",
        "Issue pages successfully fetched"
    )
    .expect("collector pages fetched")
});

pub static ISSUES_FETCHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "collector_issues_fetched_total",
        "Issue nodes kept after truncation to the per-target cap"
    )
    .expect("collector issues fetched")
});

pub static RECORDS_DROPPED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_records_dropped_total",
        "Issue nodes excluded from the table grouped by reason",
        &["reason"]
    )
    .expect("collector records dropped")
});

pub static FETCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_requests_total",
        "Page fetches grouped by outcome",
        &["outcome"]
    )
    .expect("collector fetch requests total")
});

pub static FETCH_LATENCY_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "collector_fetch_latency_seconds",
        "Latency of page fetches",
        vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .expect("collector fetch latency seconds")
});

pub static FETCH_RETRIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "collector_fetch_retries_total",
        "Page fetches retried after a transient failure grouped by cause",
        &["cause"]
    )
    .expect("collector fetch retries total")
});

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub struct ActiveTargetGuard;

impl Default for ActiveTargetGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveTargetGuard {
    pub fn new() -> Self {
        ACTIVE_TARGETS.inc();
        Self
    }
}

impl Drop for ActiveTargetGuard {
    fn drop(&mut self) {
        ACTIVE_TARGETS.dec();
    }
}
