use crate::types::{BackendError, FeedFetcher, FetchConfig, RequestHeaders};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

/// `FeedFetcher` over HTTP. One attempt per call; there are no retries.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, BackendError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(redirect)
            .build()
            .map_err(|e| BackendError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn max_bytes(&self) -> u64 {
        self.config.max_feed_size_mb as u64 * 1024 * 1024
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &RequestHeaders) -> Result<String, BackendError> {
        let start_time = Instant::now();
        debug!("Fetching {}", url);

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_bytes() {
                return Err(BackendError::InvalidResponse(format!(
                    "Body too large: {} bytes (limit {}MB)",
                    content_length, self.config.max_feed_size_mb
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        // Chunked responses carry no length up front.
        if body.len() as u64 > self.max_bytes() {
            return Err(BackendError::InvalidResponse(format!(
                "Body too large: {} bytes (limit {}MB)",
                body.len(),
                self.config.max_feed_size_mb
            )));
        }

        debug!(
            "Fetched {} ({} bytes in {}ms)",
            url,
            body.len(),
            start_time.elapsed().as_millis()
        );
        Ok(body)
    }
}
