use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;
use url::Url;

use crate::error::ConfigError;

// Include the default configuration at compile time
const DEFAULT_CONFIG: &str = include_str!("../default_gatherer.toml");

pub const DEFAULT_CONFIG_FILE: &str = "gatherer.toml";

pub const MAX_RETRIES: u32 = 5;
pub const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub censys: CensysConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sink: Option<SinkConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub eot2016: String,
    pub dap: String,
    pub parents: String,
    #[serde(default = "default_parents_column")]
    pub parents_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CensysConfig {
    #[serde(default = "default_censys_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_id: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_censys_query")]
    pub query: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for CensysConfig {
    fn default() -> Self {
        Self {
            api_url: default_censys_api_url(),
            api_id: None,
            secret: None,
            query: default_censys_query(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Where the finished report goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    S3 {
        bucket: String,
        #[serde(default = "default_s3_key")]
        key: String,
        region: String,
        /// Path-style endpoint for S3-compatible stores. Virtual-hosted AWS
        /// endpoints are used when unset.
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key_id: Option<String>,
        #[serde(default)]
        secret_access_key: Option<String>,
    },
    Github {
        #[serde(default = "default_github_api_url")]
        api_url: String,
        owner: String,
        repo: String,
        #[serde(default = "default_github_branch")]
        branch: String,
        #[serde(default = "default_github_path")]
        path: String,
        #[serde(default = "default_commit_message")]
        message: String,
        #[serde(default)]
        token: Option<String>,
    },
    File {
        path: PathBuf,
    },
}

impl SinkConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SinkConfig::S3 { .. } => "s3",
            SinkConfig::Github { .. } => "github",
            SinkConfig::File { .. } => "file",
        }
    }
}

fn default_parents_column() -> String {
    "Domain Name".to_string()
}

fn default_censys_api_url() -> String {
    "https://censys.io/api/v1".to_string()
}

fn default_censys_query() -> String {
    ".gov".to_string()
}

fn default_max_pages() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_s3_key() -> String {
    "domain-list.csv".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_branch() -> String {
    "master".to_string()
}

fn default_github_path() -> String {
    "data/domain-list.csv".to_string()
}

fn default_commit_message() -> String {
    "updating file".to_string()
}

impl Config {
    /// The configuration compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_CONFIG)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration: an explicit path, then `gatherer.toml` in
    /// the working directory, then the embedded defaults. Credentials from
    /// the environment are applied on top.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let start_time = Instant::now();
        info!(
            action = "start",
            component = "config_loading",
            "Starting configuration loading"
        );

        let mut config = if let Some(path) = config_path {
            info!(action = "load", component = "config_file", file_path = ?path, "Loading configuration from specified file");
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::parse(&fs::read_to_string(path)?)?
        } else {
            let default_file = Path::new(DEFAULT_CONFIG_FILE);
            if default_file.exists() {
                info!(action = "load", component = "default_config_file", file_path = ?default_file, "Loading configuration from default file");
                Self::parse(&fs::read_to_string(default_file)?)?
            } else {
                info!(
                    action = "load",
                    component = "embedded_config",
                    "Using embedded default configuration"
                );
                Self::embedded()?
            }
        };

        config.apply_env(|key| std::env::var(key).ok());

        info!(
            action = "complete",
            component = "config_loading",
            sink = config.sink.as_ref().map(SinkConfig::kind).unwrap_or("none"),
            duration_ms = start_time.elapsed().as_millis(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Fill credentials from environment variables. Non-empty variables win
    /// over values from the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(id) = env("CENSYS_API_ID") {
            self.censys.api_id = Some(id);
        }
        if let Some(secret) = env("CENSYS_SECRET") {
            self.censys.secret = Some(secret);
        }

        match &mut self.sink {
            Some(SinkConfig::Github { token, .. }) => {
                if let Some(value) = env("GITHUB_TOKEN") {
                    *token = Some(value);
                }
            }
            Some(SinkConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            }) => {
                if let Some(value) = env("AWS_ACCESS_KEY_ID") {
                    *access_key_id = Some(value);
                }
                if let Some(value) = env("AWS_SECRET_ACCESS_KEY") {
                    *secret_access_key = Some(value);
                }
            }
            Some(SinkConfig::File { .. }) | None => {}
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("sources.eot2016", &self.sources.eot2016)?;
        check_url("sources.dap", &self.sources.dap)?;
        check_url("sources.parents", &self.sources.parents)?;
        check_url("censys.api_url", &self.censys.api_url)?;

        if self.sources.parents_column.is_empty() {
            return Err(ConfigError::Invalid(
                "sources.parents_column must not be empty".into(),
            ));
        }
        if self.censys.query.is_empty() {
            return Err(ConfigError::Invalid("censys.query must not be empty".into()));
        }
        if self.fetch.retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "fetch.retries must be at most {}",
                MAX_RETRIES
            )));
        }
        if self.fetch.backoff_ms > MAX_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "fetch.backoff_ms must be at most {}",
                MAX_BACKOFF_MS
            )));
        }
        if self.censys.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "censys.max_pages must be greater than 0".into(),
            ));
        }

        match &self.sink {
            Some(SinkConfig::Github { api_url, .. }) => check_url("sink.api_url", api_url)?,
            Some(SinkConfig::S3 {
                endpoint: Some(endpoint),
                ..
            }) => check_url("sink.endpoint", endpoint)?,
            _ => {}
        }

        Ok(())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

pub fn init_default_config() -> anyhow::Result<()> {
    let default_file = Path::new(DEFAULT_CONFIG_FILE);

    if default_file.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            DEFAULT_CONFIG_FILE
        );
    }

    fs::write(default_file, DEFAULT_CONFIG)?;
    println!("Created {} with default configuration", DEFAULT_CONFIG_FILE);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn embedded_config_is_valid() {
        let config = Config::embedded().unwrap();
        assert_eq!(config.sources.parents_column, "Domain Name");
        assert_eq!(config.censys.query, ".gov");
        assert_eq!(config.fetch.retries, 2);
        assert!(config.sink.is_none());
    }

    #[test]
    fn parse_github_sink_with_defaults() {
        let config = Config::parse(
            r#"
[sources]
eot2016 = "https://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"

[sink]
kind = "github"
owner = "18F"
repo = "domain-scan-orchestration"
"#,
        )
        .unwrap();

        assert_eq!(config.censys, CensysConfig::default());
        assert_eq!(config.fetch, FetchConfig::default());
        match config.sink {
            Some(SinkConfig::Github {
                branch,
                path,
                api_url,
                ..
            }) => {
                assert_eq!(branch, "master");
                assert_eq!(path, "data/domain-list.csv");
                assert_eq!(api_url, "https://api.github.com");
            }
            other => panic!("unexpected sink: {:?}", other),
        }
    }

    #[test]
    fn rejects_non_http_source() {
        let err = Config::parse(
            r#"
[sources]
eot2016 = "ftp://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                field: "sources.eot2016",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unbounded_retry_settings() {
        let base = r#"
[sources]
eot2016 = "https://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"
"#;

        let err = Config::parse(&format!("{}\n[fetch]\nretries = 4000000000\n", base)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("fetch.retries")));

        let err = Config::parse(&format!("{}\n[fetch]\nbackoff_ms = 86400000\n", base)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("fetch.backoff_ms")));

        let config = Config::parse(&format!("{}\n[fetch]\nretries = {}\n", base, MAX_RETRIES)).unwrap();
        assert_eq!(config.fetch.retries, MAX_RETRIES);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = Config::parse(
            r#"
[sources]
eot2016 = "https://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"
broker_url = "redis://localhost:6379"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_credentials() {
        let mut config = Config::parse(
            r#"
[sources]
eot2016 = "https://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"

[censys]
api_id = "from-file"

[sink]
kind = "s3"
bucket = "reports"
region = "us-east-1"
"#,
        )
        .unwrap();

        let env: HashMap<&str, &str> = [
            ("CENSYS_API_ID", "from-env"),
            ("CENSYS_SECRET", ""),
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "SECRET"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.censys.api_id.as_deref(), Some("from-env"));
        assert_eq!(config.censys.secret, None);
        match config.sink {
            Some(SinkConfig::S3 {
                access_key_id,
                secret_access_key,
                key,
                ..
            }) => {
                assert_eq!(access_key_id.as_deref(), Some("AKID"));
                assert_eq!(secret_access_key.as_deref(), Some("SECRET"));
                assert_eq!(key, "domain-list.csv");
            }
            other => panic!("unexpected sink: {:?}", other),
        }
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[sources]
eot2016 = "https://example.com/eot.csv"
dap = "https://example.com/dap.csv"
parents = "https://example.com/parents.csv"

[sink]
kind = "file"
path = "out/domain-list.csv"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.sink,
            Some(SinkConfig::File {
                path: PathBuf::from("out/domain-list.csv")
            })
        );
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/gatherer.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
