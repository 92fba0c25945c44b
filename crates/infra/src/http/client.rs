//! HTTP client with built-in retry and timeout support.

use std::time::Duration;

use hivedesk_domain::HiveDeskError;
use reqwest::{Client as ReqwestClient, Response};
use tracing::debug;

use crate::errors::InfraError;

/// Thin wrapper over reqwest with a bounded timeout and capped exponential
/// backoff on transient failures.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, HiveDeskError> {
        Self::builder().build()
    }

    /// GET a URL with retry semantics.
    ///
    /// Server errors (5xx) and connect/timeout failures are retried up to
    /// the configured attempt budget; everything else returns immediately.
    pub async fn get(&self, url: &str) -> Result<Response, HiveDeskError> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            debug!(attempt = attempt + 1, url, "sending HTTP request");

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && (err.is_timeout() || err.is_connect()) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(HiveDeskError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    /// Total per-request timeout, connection included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Base delay for the exponential backoff schedule.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// User-Agent header sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpClient, HiveDeskError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(InfraError::from)?;
        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
        })
    }
}
