use thiserror::Error;

use crate::sources::Source;

/// A fetch failure. Fatal for the run that hit it.
#[derive(Debug, Error)]
#[error("failed to fetch {feed}: {cause}")]
pub struct FetchError {
    pub feed: Source,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(feed: Source, cause: FetchCause) -> Self {
        Self { feed, cause }
    }
}

#[derive(Debug, Error)]
pub enum FetchCause {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("CSV parse error: {0}")]
    Csv(String),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("missing credentials ({0})")]
    MissingCredentials(&'static str),
}

/// A sink write failure. Never invalidates the computed report.
#[derive(Debug, Error)]
#[error("failed to persist to {sink}: {cause}")]
pub struct PersistError {
    pub sink: String,
    pub cause: PersistCause,
}

impl PersistError {
    pub fn new(sink: impl Into<String>, cause: PersistCause) -> Self {
        Self {
            sink: sink.into(),
            cause,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistCause {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Response(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing credentials ({0})")]
    MissingCredentials(&'static str),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("report is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: invalid flag '{value}' in column '{column}'")]
    InvalidFlag {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("CSV output is not valid UTF-8")]
    Encoding,
}

/// Why a pipeline run produced no report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_names_the_feed() {
        let err = FetchError::new(
            Source::Dap,
            FetchCause::Connection("connection refused".into()),
        );
        assert_eq!(
            err.to_string(),
            "failed to fetch dap: connection error: connection refused"
        );
    }

    #[test]
    fn persist_error_names_the_sink() {
        let err = PersistError::new(
            "github",
            PersistCause::Status {
                status: 422,
                body: "Update is not a fast forward".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "failed to persist to github: HTTP 422: Update is not a fast forward"
        );
    }
}
