//! Append-only transcript

use parking_lot::RwLock;
use std::sync::Arc;

use crate::message::Message;

/// Shared handle to the messages of one mounted chat view. Clones see the
/// same transcript.
pub struct Transcript {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append a message; returns its position
    pub fn append(&self, message: Message) -> usize {
        let mut messages = self.messages.write();
        tracing::trace!(origin = %message.origin(), index = messages.len(), "Message appended");
        messages.push(message);
        messages.len() - 1
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn get(&self, index: usize) -> Option<Message> {
        self.messages.read().get(index).cloned()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Messages appended at or after `index`
    pub fn since(&self, index: usize) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .skip(index)
            .cloned()
            .collect()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Transcript {
    fn clone(&self) -> Self {
        Self {
            messages: Arc::clone(&self.messages),
        }
    }
}
