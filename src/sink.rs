use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

use crate::config::{FetchConfig, SinkConfig};
use crate::error::{PersistCause, PersistError};
use crate::github::GitHubSink;
use crate::s3::ObjectStoreSink;

/// What a successful write left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    pub sink: String,
    pub location: String,
    /// Commit SHA or object ETag, when the sink reports one.
    pub revision: Option<String>,
}

/// A persistent destination for the finished report.
pub trait ReportSink {
    fn name(&self) -> &str;

    /// Path, key or file the report is written to.
    fn target(&self) -> &str;

    fn put(&self, path: &str, bytes: &[u8]) -> Result<PersistReceipt, PersistCause>;
}

pub fn persist(csv_text: &str, sink: &dyn ReportSink) -> Result<PersistReceipt, PersistError> {
    let start_time = Instant::now();
    info!(action = "start", component = "persist", sink = sink.name(), target = sink.target(), bytes = csv_text.len(), "Persisting report");

    match sink.put(sink.target(), csv_text.as_bytes()) {
        Ok(receipt) => {
            info!(
                action = "complete",
                component = "persist",
                sink = sink.name(),
                location = receipt.location.as_str(),
                revision = receipt.revision.as_deref().unwrap_or(""),
                duration_ms = start_time.elapsed().as_millis(),
                "Report persisted"
            );
            Ok(receipt)
        }
        Err(cause) => {
            let err = PersistError::new(sink.name(), cause);
            error!(action = "failed", component = "persist", sink = sink.name(), error = %err, "Failed to persist report");
            Err(err)
        }
    }
}

pub fn build_sink(config: &SinkConfig, fetch: &FetchConfig) -> Result<Box<dyn ReportSink>, PersistError> {
    let sink: Box<dyn ReportSink> = match config {
        SinkConfig::File { path } => Box::new(FileSink::new(path.clone())),
        SinkConfig::Github { .. } => Box::new(
            GitHubSink::from_config(config, fetch).map_err(|e| PersistError::new("github", e))?,
        ),
        SinkConfig::S3 { .. } => Box::new(
            ObjectStoreSink::from_config(config, fetch).map_err(|e| PersistError::new("s3", e))?,
        ),
    };
    Ok(sink)
}

/// Writes the report to the local filesystem.
pub struct FileSink {
    path: PathBuf,
    label: String,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl ReportSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn target(&self) -> &str {
        &self.label
    }

    fn put(&self, _path: &str, bytes: &[u8]) -> Result<PersistReceipt, PersistCause> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, bytes)?;

        Ok(PersistReceipt {
            sink: self.name().to_string(),
            location: self.label.clone(),
            revision: None,
        })
    }
}
