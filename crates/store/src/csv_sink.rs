use std::path::{Path, PathBuf};

use async_trait::async_trait;
use normalizer::IssueRecord;
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::{Result, SinkError};
use crate::schema::{IssueRow, COLUMNS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: usize,
}

/// Persists one run's records. Each write fully replaces what the destination held before.
#[async_trait]
pub trait IssueSink: Send + Sync {
    async fn write(&self, records: &[IssueRecord], destination: &str) -> Result<SinkReceipt>;
}

#[derive(Debug, Default)]
pub struct CsvSink {
    write_lock: Mutex<()>,
}

impl CsvSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(records: &[IssueRecord], path: &Path) -> Result<Vec<u8>> {
        let encode_err = |source| SinkError::Encode {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(COLUMNS).map_err(encode_err)?;
        for record in records {
            writer.serialize(IssueRow::from(record)).map_err(encode_err)?;
        }
        writer.into_inner().map_err(|err| SinkError::Io {
            path: path.to_path_buf(),
            source: err.into_error(),
        })
    }
}

#[async_trait]
impl IssueSink for CsvSink {
    async fn write(&self, records: &[IssueRecord], destination: &str) -> Result<SinkReceipt> {
        let path = PathBuf::from(destination);
        let file_name = path
            .file_name()
            .ok_or_else(|| SinkError::InvalidDestination(destination.to_string()))?
            .to_string_lossy()
            .into_owned();
        let bytes = Self::encode(records, &path)?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SinkError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let staging = path.with_file_name(format!(".{file_name}.tmp"));
        if let Err(err) = replace_with(&staging, &path, &bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err);
        }

        info!(
            path = %path.display(),
            rows = records.len(),
            bytes = bytes.len(),
            "wrote issue table"
        );
        Ok(SinkReceipt {
            path,
            rows: records.len(),
            bytes: bytes.len(),
        })
    }
}

async fn replace_with(staging: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SinkError::Io { path, source }
    };
    tokio::fs::write(staging, bytes)
        .await
        .map_err(io_err(staging))?;
    tokio::fs::rename(staging, path)
        .await
        .map_err(io_err(path))
}
