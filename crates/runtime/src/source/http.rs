//! HTTP provider source.

use super::EventSource;
use crate::FetchError;
use std::time::Duration;
use storage::RawEvent;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for creating an HTTP source.
#[derive(Debug, Clone)]
pub struct HttpSourceBuilder {
    url: String,
    timeout: Option<Duration>,
}

impl HttpSourceBuilder {
    /// Create a new builder for the given endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the per-request timeout. `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpSource, FetchError> {
        let mut client = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(HttpSource {
            client,
            url: self.url,
        })
    }
}

/// Pulls event batches with a single `GET` to a JSON endpoint.
///
/// The endpoint must answer with a JSON array of
/// `{"timestamp": ..., "type": ..., "value": ...}` objects.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Create a builder for the HTTP source.
    pub fn builder(url: impl Into<String>) -> HttpSourceBuilder {
        HttpSourceBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http({})", self.url)
    }
}

impl EventSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<RawEvent>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
