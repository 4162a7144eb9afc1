//! Signed-in account descriptor

use serde::{Deserialize, Serialize};
use simplechat_storage::CachedAccount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique user identifier (`<object id>.<tenant id>`)
    pub home_account_id: String,
    /// Sign-in name, usually an email address
    pub username: String,
    /// Display name
    pub name: String,
    pub tenant_id: String,
}

impl Account {
    pub fn new(home_account_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            username: username.into(),
            name: String::new(),
            tenant_id: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name for display, falling back to the sign-in name
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

impl From<CachedAccount> for Account {
    fn from(cached: CachedAccount) -> Self {
        Self {
            home_account_id: cached.home_account_id,
            username: cached.username,
            name: cached.name,
            tenant_id: cached.tenant_id,
        }
    }
}

impl From<&Account> for CachedAccount {
    fn from(account: &Account) -> Self {
        Self {
            home_account_id: account.home_account_id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            tenant_id: account.tenant_id.clone(),
        }
    }
}
