//! Submission State Machine
//!
//! ```text
//! Idle
//!   ↓ submit
//! Sending
//!   ↓ reply, error or redirect
//! Done
//! ```
//!
//! Every submission has its own state; there is no global "busy" flag.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitState {
    #[default]
    Idle,
    /// Waiting for a token or the chat endpoint
    Sending,
    /// Finished, whatever the outcome
    Done,
}

impl SubmitState {
    pub fn can_transition_to(&self, target: SubmitState) -> bool {
        match (self, target) {
            (SubmitState::Idle, SubmitState::Sending) => true,
            (SubmitState::Sending, SubmitState::Done) => true,
            // Same state is always valid (no-op)
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, SubmitState::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitState::Idle => "idle",
            SubmitState::Sending => "sending",
            SubmitState::Done => "done",
        }
    }
}

impl std::fmt::Display for SubmitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SubmitState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SubmitState::Idle),
            "sending" => Ok(SubmitState::Sending),
            "done" => Ok(SubmitState::Done),
            _ => Err(format!("Unknown submit state: {}", s)),
        }
    }
}
