use std::path::Path;

use analysis::{load_table, AnalysisReport};
use anyhow::{bail, Context, Result};
use common::{logging, AppConfig};
use tracing::{info, warn};

/// Summarizes every configured group table and prints the report as JSON on stdout.
fn main() -> Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init_logging(&config.observability)?;
    if config.groups.is_empty() {
        bail!("no groups configured");
    }

    let mut tables = Vec::new();
    for group in &config.groups {
        match load_table(Path::new(&group.output)) {
            Ok(rows) => {
                info!(group = %group.name, rows = rows.len(), "loaded group table");
                tables.push((group.name.clone(), rows));
            }
            Err(err) => warn!(group = %group.name, error = %err, "skipping group"),
        }
    }
    if tables.is_empty() {
        bail!("none of the group tables could be read");
    }

    let report = AnalysisReport::build(&tables);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
