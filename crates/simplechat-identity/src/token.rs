//! Bearer token handle

use chrono::{DateTime, Duration, Utc};

use crate::scope::ScopeSet;

/// A short-lived bearer token. Never persisted by the client.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenHandle {
    value: String,
    scopes: ScopeSet,
    expires_at: DateTime<Utc>,
}

impl TokenHandle {
    pub fn new(value: impl Into<String>, scopes: ScopeSet, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            scopes,
            expires_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Usable for every scope in `requested` for at least `margin` longer
    pub fn covers(&self, requested: &ScopeSet, margin: Duration) -> bool {
        requested.is_subset(&self.scopes) && self.expires_at > Utc::now() + margin
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl std::fmt::Debug for TokenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHandle")
            .field("value", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
