//! Chat message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Assistant text appended when a prompt could not be answered
pub const ERROR_REPLY: &str = "An error occurred while sending the message.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    Assistant,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transcript entry. Fields are private so a message cannot change once
/// created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    origin: Origin,
    text: String,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(origin: Origin, text: impl Into<String>) -> Self {
        Self {
            origin,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Origin::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, text)
    }

    /// The fixed reply shown when sending failed
    pub fn error_reply() -> Self {
        Self::assistant(ERROR_REPLY)
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_error_reply(&self) -> bool {
        self.origin == Origin::Assistant && self.text == ERROR_REPLY
    }
}
