//! Google Gemini summarizer using the `generateContent` HTTP API.
//!
//! ## Example
//!
//! ```rust,no_run
//! use carewatch_summary::{GeminiSummarizer, Summarizer};
//! use carewatch_types::Patient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summarizer = GeminiSummarizer::builder()
//!         .api_key("my-key")
//!         .model("gemini-2.5-flash")
//!         .build()?;
//!
//!     let patient = Patient::builder("pat-1", "Elena").build();
//!     println!("{}", summarizer.summarize(&patient).await?);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use carewatch_types::Patient;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{build_prompt, Summarizer, SummaryError};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini-backed summarizer.
#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiSummarizer {
    /// Create a new builder for configuring the summarizer.
    pub fn builder() -> GeminiSummarizerBuilder {
        GeminiSummarizerBuilder::default()
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate(&self, prompt: String) -> Result<String, SummaryError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SummaryError::Auth("API key rejected".to_string()));
        }

        if !status.is_success() {
            return Err(SummaryError::Http(format!("API returned status {}", status)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SummaryError::Parse(e.to_string()))?;

        body.text().ok_or(SummaryError::EmptyResponse)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, patient: &Patient) -> Result<String, SummaryError> {
        debug!(patient = %patient.id, model = %self.model, "requesting summary");
        self.generate(build_prompt(patient)).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Builder for GeminiSummarizer.
#[derive(Debug, Default)]
pub struct GeminiSummarizerBuilder {
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiSummarizerBuilder {
    /// Set the API endpoint (default: Google's public endpoint).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the model name (default: "gemini-2.5-flash").
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout (default: 15 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the summarizer.
    pub fn build(self) -> Result<GeminiSummarizer, SummaryError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(15));

        let client = Client::builder().timeout(timeout).build()?;

        Ok(GeminiSummarizer {
            client,
            endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: self.api_key.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
