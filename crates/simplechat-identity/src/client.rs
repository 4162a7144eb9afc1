//! Identity client capability

use async_trait::async_trait;

use crate::account::Account;
use crate::redirect::Redirect;
use crate::scope::ScopeSet;
use crate::token::TokenHandle;
use crate::Result;

/// Process-wide identity capability.
///
/// One instance lives for the whole process and is shared as
/// `Arc<dyn IdentityClient>`. `initialize` must not run concurrently with
/// itself; `SessionBootstrap` is the only caller.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Validate configuration and load the credential cache
    async fn initialize(&self) -> Result<()>;

    /// Complete a pending interactive flow, if the provider just redirected
    /// back to us. `None` when there is nothing to resolve.
    async fn handle_redirect_response(&self) -> Result<Option<Account>>;

    fn get_active_account(&self) -> Option<Account>;

    /// Cached accounts, in a stable order for the lifetime of this instance
    fn get_all_accounts(&self) -> Vec<Account>;

    fn set_active_account(&self, account: &Account) -> Result<()>;

    /// Token from cache or refresh, without user interaction.
    ///
    /// Fails with `IdentityError::InteractionRequired` when only the user can
    /// unblock the request.
    async fn acquire_token_silent(&self, scopes: &ScopeSet, account: &Account)
        -> Result<TokenHandle>;

    async fn acquire_token_interactive(&self, scopes: &ScopeSet) -> Result<Redirect>;

    async fn login_interactive(&self) -> Result<Redirect>;

    async fn logout_interactive(&self) -> Result<Redirect>;
}
