//! Web service map source.

use async_trait::async_trait;
use fm_error::{FetchError, FmError, Result};
use fm_traits::{FetchedMap, MapSource};
use fm_types::{HttpMethod, WebSourceConfig};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetches the map from an HTTP endpoint.
///
/// GET requests carry the configured params as a query string, POST requests
/// send them as a form body. Any non-2xx status is a [`FetchError::Network`].
#[derive(Debug, Clone)]
pub struct WebSource {
    client: Client,
    config: WebSourceConfig,
}

impl WebSource {
    /// Creates a web source with a client bounded by the configured timeout.
    pub fn new(config: WebSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FmError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn method_name(&self) -> &'static str {
        match self.config.method {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[async_trait]
impl MapSource for WebSource {
    async fn fetch(&self) -> std::result::Result<FetchedMap, FetchError> {
        let url = &self.config.url;
        let method = self.method_name();

        let mut request = match self.config.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };

        if !self.config.params.is_empty() {
            request = match self.config.method {
                HttpMethod::Get => request.query(&self.config.params),
                HttpMethod::Post => request.form(&self.config.params),
            };
        }

        for (name, value) in &self.config.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{method} {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("{method} {url} returned {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read body of {url}: {e}")))?;

        debug!(url = %url, method = method, bytes = body.len(), "Downloaded map");
        Ok(FetchedMap::new(body))
    }

    fn location(&self) -> &str {
        &self.config.url
    }

    fn name(&self) -> &str {
        "webservice"
    }
}
