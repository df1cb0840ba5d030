//! Completion service client.
//!
//! The conversation core only needs one thing from a language model: turn a
//! prompt string into a completion string. [`CompletionClient`] is that seam;
//! [`ResponsesClient`] implements it against the `OpenAI` Responses API
//! (`/v1/responses`) using a stored prompt template.
//!
//! # Example
//!
//! ```rust,ignore
//! use civicscape_chat::llm::{CompletionClient, CompletionSettings, ResponsesClient};
//!
//! let settings = CompletionSettings {
//!     base_url: "https://api.openai.com".to_string(),
//!     api_key: Some("sk-...".to_string()),
//!     prompt_id: "pmpt_...".to_string(),
//!     model: None,
//!     timeout: std::time::Duration::from_secs(60),
//! };
//! let client = ResponsesClient::new(settings)?;
//! let text = client.complete("\n\nUser: hello").await?;
//! ```

pub mod responses;

pub use responses::ResponsesClient;

use std::time::Duration;

use thiserror::Error;

/// Connection settings for the completion service.
#[derive(Clone)]
pub struct CompletionSettings {
    /// Base URL for the API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for bearer authentication.
    pub api_key: Option<String>,
    /// Identifier of the stored prompt template.
    pub prompt_id: String,
    /// Optional model override; the prompt template's model is used otherwise.
    pub model: Option<String>,
    /// Upper bound on a single completion round trip.
    pub timeout: Duration,
}

impl std::fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("prompt_id", &self.prompt_id)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Failure modes of a completion request.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request could not be sent or the body could not be read.
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("completion service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The service answered but no completion text could be found.
    #[error("malformed completion response: {0}")]
    Malformed(String),

    /// No answer within the configured bound.
    #[error("completion service did not respond within {0:?}")]
    Timeout(Duration),
}

impl CompletionError {
    /// Whether the failure was the service not answering in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            Self::Status { .. } | Self::Malformed(_) => false,
        }
    }

    /// Message suitable for showing to the visitor.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        if self.is_timeout() {
            "The assistant took too long to respond. Your prompt was not saved; please try again."
        } else {
            "The assistant is unavailable right now. Your prompt was not saved; please try again."
        }
    }
}

/// Trait for services that turn a prompt into a completion.
///
/// Implementations should not trim or otherwise post-process the text; the
/// conversation store owns formatting.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service rejects it, or the
    /// response carries no text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
