//! Session data structure

use serde::{Deserialize, Serialize};

use crate::account::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Bootstrap has not completed
    #[default]
    Uninitialized,
    Unauthenticated,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "uninitialized",
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Authenticated => "authenticated",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub status: SessionStatus,
    pub account: Option<Account>,
}

impl Session {
    pub fn unauthenticated() -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            account: None,
        }
    }

    pub fn authenticated(account: Account) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            account: Some(account),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Explicit logout drops the account
    pub fn logout(&mut self) {
        self.status = SessionStatus::Unauthenticated;
        self.account = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Uninitialized);
        assert!(session.account().is_none());
    }

    #[test]
    fn test_logout_resets() {
        let mut session = Session::authenticated(Account::new("a.t", "alice@contoso.com"));
        assert!(session.is_authenticated());

        session.logout();
        assert_eq!(session, Session::unauthenticated());
    }
}
