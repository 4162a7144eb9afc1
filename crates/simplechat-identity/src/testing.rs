//! Scriptable in-memory identity client for tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use url::Url;

use crate::account::Account;
use crate::client::IdentityClient;
use crate::error::{IdentityError, InitializationError};
use crate::redirect::{Redirect, RedirectKind};
use crate::scope::ScopeSet;
use crate::token::TokenHandle;
use crate::Result;

/// What `acquire_token_silent` does
#[derive(Debug, Clone)]
pub enum SilentBehavior {
    Token(String),
    InteractionRequired,
    Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub initialize: usize,
    pub handle_redirect: usize,
    pub silent: usize,
    pub interactive: usize,
}

struct State {
    init_error: Option<String>,
    pending_redirect: Option<Account>,
    accounts: Vec<Account>,
    active: Option<Account>,
    silent: SilentBehavior,
    interactive_fails: bool,
    calls: CallCounts,
}

pub struct StaticIdentity {
    state: Mutex<State>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                init_error: None,
                pending_redirect: None,
                accounts: Vec::new(),
                active: None,
                silent: SilentBehavior::Token("token".to_string()),
                interactive_fails: false,
                calls: CallCounts::default(),
            }),
        }
    }

    pub fn with_accounts(self, accounts: Vec<Account>) -> Self {
        self.state.lock().accounts = accounts;
        self
    }

    pub fn with_active(self, account: Account) -> Self {
        {
            let mut state = self.state.lock();
            if !state.accounts.contains(&account) {
                state.accounts.push(account.clone());
            }
            state.active = Some(account);
        }
        self
    }

    /// The next `handle_redirect_response` resolves to `account`
    pub fn with_pending_redirect(self, account: Account) -> Self {
        self.state.lock().pending_redirect = Some(account);
        self
    }

    pub fn failing_initialization(self, reason: &str) -> Self {
        self.state.lock().init_error = Some(reason.to_string());
        self
    }

    pub fn with_silent(self, behavior: SilentBehavior) -> Self {
        self.state.lock().silent = behavior;
        self
    }

    pub fn failing_interactive(self) -> Self {
        self.state.lock().interactive_fails = true;
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    fn redirect(kind: RedirectKind) -> Redirect {
        let url = Url::parse("https://login.example.test/authorize").expect("static url");
        Redirect::new(url, kind)
    }
}

impl Default for StaticIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityClient for StaticIdentity {
    async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.initialize += 1;
        match &state.init_error {
            Some(reason) => Err(InitializationError::new(reason.clone()).into()),
            None => Ok(()),
        }
    }

    async fn handle_redirect_response(&self) -> Result<Option<Account>> {
        let mut state = self.state.lock();
        state.calls.handle_redirect += 1;
        let account = state.pending_redirect.take();
        if let Some(account) = &account {
            if !state.accounts.contains(account) {
                state.accounts.push(account.clone());
            }
        }
        Ok(account)
    }

    fn get_active_account(&self) -> Option<Account> {
        self.state.lock().active.clone()
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        self.state.lock().accounts.clone()
    }

    fn set_active_account(&self, account: &Account) -> Result<()> {
        self.state.lock().active = Some(account.clone());
        Ok(())
    }

    async fn acquire_token_silent(
        &self,
        scopes: &ScopeSet,
        _account: &Account,
    ) -> Result<TokenHandle> {
        let mut state = self.state.lock();
        state.calls.silent += 1;
        match &state.silent {
            SilentBehavior::Token(value) => Ok(TokenHandle::new(
                value.clone(),
                scopes.clone(),
                Utc::now() + Duration::hours(1),
            )),
            SilentBehavior::InteractionRequired => Err(IdentityError::InteractionRequired(
                "interaction_required".to_string(),
            )),
            SilentBehavior::Fail => Err(IdentityError::UnexpectedResponse(
                "service unavailable".to_string(),
            )),
        }
    }

    async fn acquire_token_interactive(&self, _scopes: &ScopeSet) -> Result<Redirect> {
        let mut state = self.state.lock();
        state.calls.interactive += 1;
        if state.interactive_fails {
            return Err(IdentityError::NotInitialized);
        }
        Ok(Self::redirect(RedirectKind::Consent))
    }

    async fn login_interactive(&self) -> Result<Redirect> {
        Ok(Self::redirect(RedirectKind::Login))
    }

    async fn logout_interactive(&self) -> Result<Redirect> {
        let mut state = self.state.lock();
        state.active = None;
        state.accounts.clear();
        Ok(Self::redirect(RedirectKind::Logout))
    }
}
