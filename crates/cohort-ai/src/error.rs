//! Error types for generation calls and the workflows built on them.

use thiserror::Error;

/// Errors from a call to the generation service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    /// Request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// Service answered with a non-success status.
    #[error("generation service returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },

    /// Service answered, but the completion text is not where it should be.
    #[error("malformed response envelope: {0}")]
    MalformedEnvelope(String),

    /// No API key in the configuration file or the environment.
    #[error("no API key configured; set GEMINI_API_KEY or `api_key` in the config file")]
    MissingApiKey,

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Every attempt failed with a transport error.
    #[error("generation failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network(_) => {
                "Could not reach the generation service. Please check your internet connection."
            }
            Self::Status { .. } | Self::MalformedEnvelope(_) => {
                "The generation service did not return a usable answer."
            }
            Self::MissingApiKey => "No API key is configured for the generation service.",
            Self::Config(_) => "The AI configuration could not be loaded.",
            Self::Exhausted { .. } => {
                "The generation service is unavailable right now. Please try again later."
            }
        }
    }

    /// Returns whether this error is a transport failure worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status { .. } | Self::MalformedEnvelope(_)
        )
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result type alias for generation calls.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors surfaced by the similarity and harmonisation workflows.
///
/// Transport failures arrive here only after retries are exhausted.
/// Response failures are never retried.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The completion is not valid JSON.
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    /// The completion is JSON, but not an array.
    #[error("response is not a JSON array")]
    NotAnArray,
}

impl WorkflowError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Generation(err) => err.user_message(),
            Self::InvalidJson(_) | Self::NotAnArray => {
                "The generation service answered in an unexpected format."
            }
        }
    }

    /// Returns true when the service was reached but its answer was unusable.
    #[must_use]
    pub fn is_response_error(&self) -> bool {
        matches!(self, Self::InvalidJson(_) | Self::NotAnArray)
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
