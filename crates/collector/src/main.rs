use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use collector::{metrics, Collector, GraphqlIssueFetcher, SharedFetcher};
use common::config::GroupConfig;
use common::{logging, AppConfig, AppError};
use gh_broker::{GithubBrokerBuilder, GithubToken};
use normalizer::IssueRecord;
use store::{CsvSink, IssueSink};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init_logging(&config.observability)?;
    config.validate()?;

    let broker = GithubBrokerBuilder::new(GithubToken::new(config.github.token.clone()))
        .user_agent(config.github.user_agent.clone())
        .max_inflight(config.collector.max_concurrent_targets)
        .build()?;
    let fetcher: SharedFetcher = Arc::new(GraphqlIssueFetcher::new(
        broker,
        &config.github.graphql_url,
        config.collector.page_size,
    )?);
    let collector = Collector::from_config(&config.collector, fetcher);
    let sink = CsvSink::new();

    info!(
        groups = config.groups.len(),
        max_items = config.collector.max_items(),
        "collector started"
    );
    tokio::select! {
        result = run_groups(&config.groups, &collector, &sink, config.collector.max_items()) => result?,
        _ = wait_for_interrupt(tokio::signal::ctrl_c()) => {
            warn!("interrupted; tables of unfinished groups were not written");
            return Err(anyhow!("collection interrupted"));
        }
    }

    if let Some(path) = &config.observability.metrics_path {
        std::fs::write(path, metrics::render()?)
            .with_context(|| format!("writing metrics to {path}"))?;
    }
    Ok(())
}

async fn run_groups(
    groups: &[GroupConfig],
    collector: &Collector,
    sink: &dyn IssueSink,
    max_items: usize,
) -> Result<()> {
    for group in groups {
        info!(group = %group.name, targets = group.targets.len(), "collecting group");
        let report = collector.run(&group.targets, max_items).await?;
        let records: Vec<IssueRecord> = report.records().cloned().collect();
        let receipt = sink
            .write(&records, &group.output)
            .await
            .map_err(AppError::sink)?;

        let summary = report.summary();
        for failure in report.failures() {
            warn!(group = %group.name, error = %failure, "target skipped");
        }
        info!(
            group = %group.name,
            path = %receipt.path.display(),
            succeeded = summary.targets_succeeded,
            failed = summary.targets_failed,
            rows = receipt.rows,
            dropped = summary.records_dropped,
            anomalous = summary.anomalous_durations,
            "group finished"
        );
    }
    Ok(())
}

/// Resolves once the signal fires. If the handler cannot be installed the run continues
/// uninterruptible instead of being treated as interrupted.
async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = %err, "could not listen for Ctrl-C; continuing without it");
        std::future::pending::<()>().await;
    }
}
