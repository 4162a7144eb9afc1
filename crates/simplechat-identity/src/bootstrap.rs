//! Session bootstrap
//!
//! Runs once per page: initialize the identity client, finish any redirect
//! the provider just sent us back with, otherwise fall back to an account
//! cached by an earlier page.

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::client::IdentityClient;
use crate::error::{IdentityError, InitializationError};
use crate::session::Session;

pub struct SessionBootstrap {
    identity: Arc<dyn IdentityClient>,
    /// First outcome wins; later and concurrent callers share it
    outcome: OnceCell<Result<Session, InitializationError>>,
}

impl SessionBootstrap {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self {
            identity,
            outcome: OnceCell::new(),
        }
    }

    /// Bootstrap the session. The identity client is initialized at most once
    /// per `SessionBootstrap`, no matter how many times this is awaited.
    pub async fn bootstrap(&self) -> Result<Session, InitializationError> {
        self.outcome.get_or_init(|| self.run()).await.clone()
    }

    async fn run(&self) -> Result<Session, InitializationError> {
        if let Err(e) = self.identity.initialize().await {
            let error = match e {
                IdentityError::Initialization(error) => error,
                other => InitializationError::new(other.to_string()),
            };
            tracing::error!(error = %error, "Identity client initialization failed");
            return Err(error);
        }

        let session = self.resolve_session().await;

        tracing::info!(
            status = %session.status,
            account = session.account().map(|a| a.home_account_id.as_str()).unwrap_or("-"),
            "Session bootstrapped"
        );

        Ok(session)
    }

    /// Redirect-resolution step. Safe to repeat: with nothing pending it only
    /// reads the account cache.
    pub async fn resolve_session(&self) -> Session {
        match self.identity.handle_redirect_response().await {
            Ok(Some(account)) => {
                if let Err(e) = self.identity.set_active_account(&account) {
                    tracing::warn!(error = %e, "Failed to mark redirected account active");
                }
                return Session::authenticated(account);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Redirect handling skipped");
            }
        }

        if let Some(active) = self.identity.get_active_account() {
            return Session::authenticated(active);
        }

        match self.identity.get_all_accounts().into_iter().next() {
            Some(first) => {
                if let Err(e) = self.identity.set_active_account(&first) {
                    tracing::warn!(error = %e, "Failed to mark cached account active");
                }
                Session::authenticated(first)
            }
            None => Session::unauthenticated(),
        }
    }
}
