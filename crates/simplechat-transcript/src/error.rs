//! Transcript error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
