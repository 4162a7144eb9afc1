//! Identity error types

use thiserror::Error;

/// The identity client could not be configured. Never retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Identity client initialization failed: {reason}")]
pub struct InitializationError {
    pub reason: String,
}

impl InitializationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("Identity client not initialized")]
    NotInitialized,

    #[error("No active account")]
    NoActiveAccount,

    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    #[error("Identity provider returned {code}: {description}")]
    Provider { code: String, description: String },

    #[error("Redirect state does not match the pending request")]
    StateMismatch,

    #[error("Redirect response arrived without a pending request")]
    NoPendingRequest,

    #[error("Redirect response is missing the authorization code")]
    MissingCode,

    #[error("Invalid ID token: {0}")]
    InvalidIdToken(String),

    #[error("Unexpected token endpoint response: {0}")]
    UnexpectedResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] simplechat_storage::StorageError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// How a caller has to react to an identity failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Persistent error state for the page
    Initialization,
    /// Escalate to an interactive redirect
    InteractionRequired,
    /// Degrade and carry on without a token
    Transient,
}

impl IdentityError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IdentityError::Initialization(_) => FailureKind::Initialization,
            IdentityError::InteractionRequired(_) => FailureKind::InteractionRequired,
            _ => FailureKind::Transient,
        }
    }

    pub fn is_interaction_required(&self) -> bool {
        self.kind() == FailureKind::InteractionRequired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let err: IdentityError = InitializationError::new("missing client identifier").into();
        assert_eq!(err.kind(), FailureKind::Initialization);
        assert_eq!(
            err.to_string(),
            "Identity client initialization failed: missing client identifier"
        );

        let err = IdentityError::InteractionRequired("invalid_grant".to_string());
        assert!(err.is_interaction_required());

        assert_eq!(IdentityError::StateMismatch.kind(), FailureKind::Transient);
        assert_eq!(IdentityError::NoActiveAccount.kind(), FailureKind::Transient);
    }
}
