//! SimpleChat Chat
//!
//! Sends prompts to the remote chat endpoint and records the exchange in the
//! transcript. Failures become transcript entries, never errors for the
//! caller.

mod endpoint;
mod error;
mod session;

pub use endpoint::{ChatEndpoint, ChatReply, ChatRequest, HttpChatEndpoint, UnconfiguredEndpoint};
pub use error::ChatError;
pub use session::{ChatSession, SubmitOutcome};

pub type Result<T> = std::result::Result<T, ChatError>;
