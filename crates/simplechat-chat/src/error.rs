//! Remote call errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat endpoint returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Malformed chat response: {0}")]
    MalformedBody(String),

    #[error("Invalid chat endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Chat endpoint not configured")]
    NotConfigured,
}

impl ChatError {
    /// Name reported to telemetry
    pub fn type_name(&self) -> &'static str {
        match self {
            ChatError::Http(_) => "NetworkError",
            ChatError::Status { .. } => "HttpStatusError",
            ChatError::MalformedBody(_) => "MalformedResponseError",
            ChatError::Url(_) | ChatError::NotConfigured => "ConfigurationError",
        }
    }
}
