//! # carewatch-summary
//!
//! Patient summaries from an external text-generation service.
//!
//! The service sits across a network boundary and can fail for any reason
//! (no credentials, timeouts, bad responses). Callers go through
//! [`summarize_or_fallback`], which always yields displayable text: the
//! generated summary on success, a fixed notice otherwise.
//!
//! ## Implementations
//!
//! - [`UnconfiguredSummarizer`] - no credentials; answers with a fixed notice
//!   without calling anything
//! - `GeminiSummarizer` (`gemini` feature) - Google Gemini `generateContent`
//!
//! ## Example
//!
//! ```rust
//! use carewatch_summary::{summarize_or_fallback, UnconfiguredSummarizer, UNCONFIGURED_NOTICE};
//! use carewatch_types::Patient;
//!
//! # tokio_test::block_on(async {
//! let patient = Patient::builder("pat-1", "Elena").build();
//! let text = summarize_or_fallback(&UnconfiguredSummarizer, &patient).await;
//! assert_eq!(text, UNCONFIGURED_NOTICE);
//! # });
//! ```

pub mod error;
pub mod prompt;

#[cfg(feature = "gemini")]
pub mod gemini;

pub use error::SummaryError;
pub use prompt::build_prompt;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiSummarizer, GeminiSummarizerBuilder};

use std::fmt::Debug;

use async_trait::async_trait;
use carewatch_types::Patient;
use tracing::warn;

/// Shown when the summary service failed.
pub const FALLBACK_NOTICE: &str =
    "The AI summary could not be generated right now. Please try again later.";

/// Shown when no summary service is configured.
pub const UNCONFIGURED_NOTICE: &str =
    "The AI summary is not available. The API key is not configured.";

/// A source of free-text patient summaries.
#[async_trait]
pub trait Summarizer: Send + Sync + Debug {
    /// Summarize the given patient snapshot.
    async fn summarize(&self, patient: &Patient) -> Result<String, SummaryError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Summarize `patient`, converting any failure into [`FALLBACK_NOTICE`].
///
/// Failures are logged and never retried.
pub async fn summarize_or_fallback(summarizer: &dyn Summarizer, patient: &Patient) -> String {
    match summarizer.summarize(patient).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(
                summarizer = summarizer.name(),
                patient = %patient.id,
                error = %SummaryError::EmptyResponse,
                "summary generation failed, using fallback notice"
            );
            FALLBACK_NOTICE.to_string()
        }
        Err(e) => {
            warn!(
                summarizer = summarizer.name(),
                patient = %patient.id,
                error = %e,
                "summary generation failed, using fallback notice"
            );
            FALLBACK_NOTICE.to_string()
        }
    }
}

/// Summarizer used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredSummarizer;

#[async_trait]
impl Summarizer for UnconfiguredSummarizer {
    async fn summarize(&self, _patient: &Patient) -> Result<String, SummaryError> {
        Ok(UNCONFIGURED_NOTICE.to_string())
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}
