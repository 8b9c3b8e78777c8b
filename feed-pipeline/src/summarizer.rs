use crate::types::{BackendError, Summarizer, SummaryRequest};
use crate::utils::text;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub api_token: String,
    /// Backend-specific model or engine name.
    pub engine: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://kagi.com/api/v0/summarize".to_string(),
            api_token: String::new(),
            engine: None,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummarizeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    data: Option<SummaryData>,
    #[serde(default)]
    error: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    msg: Option<String>,
}

/// Pull the summary out of a response body, or the backend's own error.
pub(crate) fn decode_response(body: &str) -> Result<String, BackendError> {
    let response: SummarizeResponse = serde_json::from_str(body)
        .map_err(|e| BackendError::InvalidResponse(format!("Undecodable summary response: {}", e)))?;

    if let Some(first) = response.error.first() {
        return Err(BackendError::InvalidResponse(format!(
            "Summarizer error {}: {}",
            first.code.unwrap_or_default(),
            first.msg.as_deref().unwrap_or("unknown")
        )));
    }

    let output = response
        .data
        .and_then(|data| data.output)
        .map(|output| output.trim().to_string())
        .unwrap_or_default();
    if output.is_empty() {
        return Err(BackendError::InvalidResponse("Empty summary".to_string()));
    }
    Ok(output)
}

/// Summarizer speaking a `{"url"|"text"} -> {"data": {"output"}}` JSON API.
pub struct HttpSummarizer {
    client: Client,
    config: SummarizerConfig,
}

impl HttpSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BackendError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    fn name(&self) -> String {
        format!("HTTP summarizer ({})", self.config.endpoint)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, BackendError> {
        let body = match request {
            SummaryRequest::Url(url) => SummarizeBody {
                url: Some(url.as_str()),
                text: None,
                engine: self.config.engine.as_deref(),
            },
            SummaryRequest::Text(text) => SummarizeBody {
                url: None,
                text: Some(text.as_str()),
                engine: self.config.engine.as_deref(),
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bot {}", self.config.api_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = match decode_response(&payload) {
                Err(BackendError::InvalidResponse(message)) => message,
                _ => status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let summary = decode_response(&payload)?;
        debug!("Received summary ({} chars)", summary.chars().count());
        Ok(summary)
    }
}

/// Offline summarizer for development and testing
pub struct MockSummarizer {
    name: String,
    response_delay_ms: u64,
}

impl MockSummarizer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> String {
        format!("Mock summarizer ({})", self.name)
    }

    async fn summarize(&self, request: &SummaryRequest) -> Result<String, BackendError> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }

        match request {
            SummaryRequest::Url(url) => Ok(format!("Summary of {}", url)),
            SummaryRequest::Text(body) => {
                let lead = text::extract_sentences(&text::collapse_whitespace(body), 2);
                if lead.is_empty() {
                    Err(BackendError::InvalidResponse("Nothing to summarize".to_string()))
                } else {
                    Ok(lead)
                }
            }
        }
    }
}
