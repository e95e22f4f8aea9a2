use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, register_int_gauge, Histogram, IntCounterVec,
    IntGauge,
};

pub static INFLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("gh_broker_inflight", "Inflight GitHub requests")
        .expect("inflight metric")
});

pub static RATE_REMAINING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gh_broker_rate_remaining",
        "Rate limit points remaining for the configured credential"
    )
    .expect("rate remaining")
});

pub static RATE_LIMIT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gh_broker_rate_limit",
        "Rate limit points per window for the configured credential"
    )
    .expect("rate limit")
});

pub static SLEEP_SECONDS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gh_broker_sleep_seconds_total",
        "Total seconds spent waiting for the rate limit window, by reason",
        &["reason"]
    )
    .expect("sleep seconds")
});

pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "gh_broker_requests_total",
        "Requests by status class",
        &["status"]
    )
    .expect("requests total")
});

pub static LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!("gh_broker_latency_seconds", "GitHub request latency")
        .expect("latency")
});
