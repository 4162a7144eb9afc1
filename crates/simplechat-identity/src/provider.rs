//! Token acquisition for outgoing requests

use std::sync::Arc;

use crate::client::IdentityClient;
use crate::error::{FailureKind, IdentityError};
use crate::redirect::Redirect;
use crate::scope::ScopeSet;
use crate::token::TokenHandle;

#[derive(Debug)]
pub enum TokenOutcome {
    Token(TokenHandle),
    /// No scopes configured; authenticated but no bearer token
    Anonymous,
    /// Soft failure; the caller proceeds without a token
    Unavailable(IdentityError),
    /// Interactive flow started. Nothing after this point in the current flow
    /// should run.
    Redirect(Redirect),
}

impl TokenOutcome {
    /// The bearer token, if one was obtained
    pub fn token(&self) -> Option<&TokenHandle> {
        match self {
            TokenOutcome::Token(token) => Some(token),
            _ => None,
        }
    }
}

pub struct TokenProvider {
    identity: Arc<dyn IdentityClient>,
}

impl TokenProvider {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self { identity }
    }

    pub async fn acquire(&self, scopes: &ScopeSet) -> TokenOutcome {
        if scopes.is_empty() {
            tracing::debug!("No API scopes configured, continuing without a token");
            return TokenOutcome::Anonymous;
        }

        let Some(account) = self.identity.get_active_account() else {
            tracing::warn!("Token requested without an active account");
            return TokenOutcome::Unavailable(IdentityError::NoActiveAccount);
        };

        match self.identity.acquire_token_silent(scopes, &account).await {
            Ok(token) => {
                tracing::debug!(scopes = %scopes, "Token acquired silently");
                TokenOutcome::Token(token)
            }
            Err(e) if e.kind() == FailureKind::InteractionRequired => {
                tracing::info!(scopes = %scopes, error = %e, "Escalating to interactive token request");
                match self.identity.acquire_token_interactive(scopes).await {
                    Ok(redirect) => TokenOutcome::Redirect(redirect),
                    Err(e) => {
                        tracing::error!(error = %e, "Interactive token request failed");
                        TokenOutcome::Unavailable(e)
                    }
                }
            }
            Err(e) => {
                tracing::warn!(scopes = %scopes, error = %e, "Token acquisition failed");
                TokenOutcome::Unavailable(e)
            }
        }
    }
}

impl Clone for TokenProvider {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
        }
    }
}
