//! Error types for the summarization boundary.

use thiserror::Error;

/// Errors that can occur while generating a patient summary.
///
/// None of these ever reach the caller of
/// [`summarize_or_fallback`](crate::summarize_or_fallback); they are logged
/// and replaced by a fixed notice.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The service answered without any text.
    #[error("Summary service returned no text")]
    EmptyResponse,
}

#[cfg(feature = "gemini")]
impl From<reqwest::Error> for SummaryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SummaryError::Timeout
        } else if err.is_connect() {
            SummaryError::Connection(err.to_string())
        } else {
            SummaryError::Http(err.to_string())
        }
    }
}
