//! One prompt on its way to the chat endpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TranscriptError;
use crate::state::SubmitState;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub prompt: String,
    pub state: SubmitState,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Whitespace-only prompts are not submissions
    pub fn new(prompt: &str) -> Result<Self> {
        if prompt.trim().is_empty() {
            return Err(TranscriptError::EmptyPrompt);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            state: SubmitState::Idle,
            created_at: Utc::now(),
            finished_at: None,
        })
    }

    pub fn transition_to(&mut self, new_state: SubmitState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(TranscriptError::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        tracing::debug!(
            submission_id = %self.id,
            from = %self.state,
            to = %new_state,
            "Submission state transition"
        );

        self.state = new_state;
        if new_state == SubmitState::Done && self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }

        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition_to(SubmitState::Sending)
    }

    /// Finish the submission. Reached from any outcome.
    pub fn finish(&mut self) -> Result<()> {
        if self.state == SubmitState::Idle {
            self.start()?;
        }
        self.transition_to(SubmitState::Done)
    }

    pub fn elapsed_ms(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.created_at).num_milliseconds()
    }
}
