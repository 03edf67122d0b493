//! Blocking HTTP client shared by the feed fetchers and the sinks.
//!
//! Retries network errors, 429 and 5xx with exponential backoff. Other
//! non-2xx statuses fail immediately.

use reqwest::blocking::{Client, RequestBuilder, Response};
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::config::FetchConfig;
use crate::error::FetchCause;
use crate::sources::Transport;

pub const USER_AGENT: &str = concat!("dotgov-gatherer/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    retries: u32,
    backoff: Duration,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchCause> {
        let http = build_client(config.timeout()).map_err(|e| FetchCause::Connection(e.to_string()))?;
        Ok(Self {
            http,
            retries: config.retries,
            backoff: config.backoff(),
        })
    }

    /// Send the request built by `build_request`, retrying transient
    /// failures. `build_request` runs once per attempt.
    pub fn send_with_retry(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Response, FetchCause> {
        let mut backoff = self.backoff;

        for attempt in 0..=self.retries {
            let last_attempt = attempt == self.retries;

            match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }

                    let code = status.as_u16();
                    let retryable = code == 429 || status.is_server_error();
                    if !retryable || last_attempt {
                        return Err(FetchCause::Status {
                            url: resp.url().to_string(),
                            status: code,
                        });
                    }

                    warn!(action = "retry", component = "http", attempt = attempt + 1, max_retries = self.retries, status = code, backoff_ms = backoff.as_millis(), "Retrying after HTTP error");
                }
                Err(e) => {
                    if last_attempt {
                        return Err(FetchCause::Connection(e.to_string()));
                    }

                    warn!(action = "retry", component = "http", attempt = attempt + 1, max_retries = self.retries, error = %e, backoff_ms = backoff.as_millis(), "Retrying after network error");
                }
            }

            thread::sleep(backoff);
            backoff = backoff.saturating_mul(2);
        }

        unreachable!("retry loop always returns on the last attempt")
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, url: &str) -> Result<String, FetchCause> {
        let resp = self.send_with_retry(|http| http.get(url))?;
        resp.text().map_err(|e| FetchCause::Body(e.to_string()))
    }
}

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}
