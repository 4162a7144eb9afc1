//! SimpleChat Transcript
//!
//! The ordered list of chat messages shown to the user, and the state each
//! prompt submission moves through. Messages are immutable and the transcript
//! is append-only.

mod error;
mod message;
mod state;
mod submission;
mod transcript;

pub use error::TranscriptError;
pub use message::{Message, Origin, ERROR_REPLY};
pub use state::SubmitState;
pub use submission::Submission;
pub use transcript::Transcript;

pub type Result<T> = std::result::Result<T, TranscriptError>;
