//! Application and page lifecycle
//!
//! `App` lives for the whole process and owns the injected identity client,
//! the telemetry hook and the chat endpoint. A `Page` is one load of the
//! user interface: it bootstraps the session exactly once and mounts the chat
//! view when authenticated. Following a redirect ends the page; the host then
//! loads a fresh one.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use simplechat_chat::{ChatEndpoint, ChatSession, HttpChatEndpoint, UnconfiguredEndpoint};
use simplechat_identity::{
    Account, IdentityClient, InitializationError, Redirect, ScopeSet, Session, SessionBootstrap,
    TokenProvider,
};
use simplechat_telemetry::Telemetry;

use crate::config::Config;
use crate::Result;

const PAGE_NAME: &str = "SimpleChat";

#[derive(Clone)]
pub enum PageState {
    /// Bootstrap has not finished
    Loading,
    /// Identity client could not be configured. Stays until the process
    /// is restarted with a fixed configuration.
    Failed(InitializationError),
    SignedOut,
    SignedIn { session: Session, chat: ChatSession },
}

impl PageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageState::Loading => "loading",
            PageState::Failed(_) => "failed",
            PageState::SignedOut => "signed_out",
            PageState::SignedIn { .. } => "signed_in",
        }
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        match self {
            PageState::SignedIn { chat, .. } => Some(chat),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            PageState::SignedIn { session, .. } => session.account(),
            _ => None,
        }
    }
}

impl std::fmt::Display for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub struct App {
    config: Config,
    identity: Arc<dyn IdentityClient>,
    telemetry: Telemetry,
    endpoint: Arc<dyn ChatEndpoint>,
    pages_loaded: AtomicUsize,
}

impl App {
    /// Wire the application around an identity client. Configuration gaps are
    /// logged, not fatal.
    pub fn new(config: Config, identity: Arc<dyn IdentityClient>) -> Self {
        config.log_warnings();

        let telemetry = Telemetry::new();
        telemetry.initialize(config.telemetry_connection_string.as_deref());

        let endpoint: Arc<dyn ChatEndpoint> = match config.chat_api_url.as_deref() {
            Some(url) => match HttpChatEndpoint::new(url, telemetry.clone()) {
                Ok(endpoint) => Arc::new(endpoint),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Chat endpoint unusable");
                    Arc::new(UnconfiguredEndpoint)
                }
            },
            None => Arc::new(UnconfiguredEndpoint),
        };

        Self::with_parts(config, identity, telemetry, endpoint)
    }

    pub fn with_parts(
        config: Config,
        identity: Arc<dyn IdentityClient>,
        telemetry: Telemetry,
        endpoint: Arc<dyn ChatEndpoint>,
    ) -> Self {
        Self {
            config,
            identity,
            telemetry,
            endpoint,
            pages_loaded: AtomicUsize::new(0),
        }
    }

    /// Start a new page. The previous page, if any, is simply dropped.
    pub fn new_page(&self) -> Page {
        // Telemetry initialization already counted the first view
        if self.pages_loaded.fetch_add(1, Ordering::SeqCst) > 0 {
            self.telemetry.track_page_view(PAGE_NAME, None);
        }

        Page {
            identity: Arc::clone(&self.identity),
            bootstrap: SessionBootstrap::new(Arc::clone(&self.identity)),
            telemetry: self.telemetry.clone(),
            endpoint: Arc::clone(&self.endpoint),
            scopes: self.config.api_scopes.clone(),
            state: RwLock::new(PageState::Loading),
        }
    }
}

pub struct Page {
    identity: Arc<dyn IdentityClient>,
    bootstrap: SessionBootstrap,
    telemetry: Telemetry,
    endpoint: Arc<dyn ChatEndpoint>,
    scopes: ScopeSet,
    state: RwLock<PageState>,
}

impl Page {
    pub fn state(&self) -> PageState {
        self.state.read().clone()
    }

    /// Bootstrap the session and mount the view. Later calls return the
    /// state without bootstrapping again.
    pub async fn load(&self) -> PageState {
        let outcome = self.bootstrap.bootstrap().await;

        let mut state = self.state.write();
        if !matches!(*state, PageState::Loading) {
            return state.clone();
        }

        *state = match outcome {
            Err(error) => {
                self.telemetry
                    .track_exception("InitializationError", &error.reason);
                PageState::Failed(error)
            }
            Ok(session) if session.is_authenticated() => {
                if let Some(account) = session.account() {
                    self.telemetry
                        .set_authenticated_user_context(&account.home_account_id);
                }
                let chat = ChatSession::new(
                    TokenProvider::new(Arc::clone(&self.identity)),
                    self.scopes.clone(),
                    Arc::clone(&self.endpoint),
                    self.telemetry.clone(),
                );
                PageState::SignedIn { session, chat }
            }
            Ok(_) => PageState::SignedOut,
        };

        tracing::info!(state = state.as_str(), "Page loaded");

        state.clone()
    }

    pub fn chat(&self) -> Option<ChatSession> {
        self.state.read().chat().cloned()
    }

    /// Navigate to the provider's sign-in page
    pub async fn login(&self) -> Result<Redirect> {
        Ok(self.identity.login_interactive().await?)
    }

    /// Sign out locally and navigate to the provider's sign-out page
    pub async fn logout(&self) -> Result<Redirect> {
        let redirect = self.identity.logout_interactive().await?;

        self.telemetry.clear_authenticated_user_context();
        let mut state = self.state.write();
        if let PageState::SignedIn { session, .. } = &mut *state {
            session.logout();
        }
        *state = PageState::SignedOut;

        Ok(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplechat_identity::testing::StaticIdentity;
    use simplechat_identity::{RedirectKind, SessionStatus};
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn alice() -> Account {
        Account::new("a.t", "alice@contoso.com")
    }

    fn bob() -> Account {
        Account::new("b.t", "bob@contoso.com")
    }

    #[tokio::test]
    async fn test_signed_out_page() {
        let identity = Arc::new(StaticIdentity::new());
        let app = App::new(config(&[]), identity);
        let page = app.new_page();

        assert!(matches!(page.state(), PageState::Loading));
        assert!(matches!(page.load().await, PageState::SignedOut));
        assert!(page.chat().is_none());

        let redirect = page.login().await.unwrap();
        assert_eq!(redirect.kind(), RedirectKind::Login);
    }

    #[tokio::test]
    async fn test_cached_accounts_mount_chat() {
        let identity = Arc::new(StaticIdentity::new().with_accounts(vec![alice(), bob()]));
        let app = App::new(config(&[]), identity.clone());
        let page = app.new_page();

        let state = page.load().await;
        assert_eq!(state.account(), Some(&alice()));
        assert!(page.chat().is_some());
        assert_eq!(identity.get_active_account(), Some(alice()));
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let identity = Arc::new(StaticIdentity::new().with_accounts(vec![alice()]));
        let app = App::new(config(&[]), identity.clone());
        let page = app.new_page();

        let _ = page.load().await;
        let chat = page.chat().unwrap();
        chat.transcript().append(simplechat_transcript::Message::user("kept"));

        let _ = page.load().await;
        assert_eq!(identity.calls().initialize, 1);
        // Same mounted view, same transcript
        assert_eq!(page.chat().unwrap().transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_initialization_failure_is_persistent() {
        let identity = Arc::new(StaticIdentity::new().failing_initialization("missing client identifier"));
        let app = App::new(config(&[]), identity);
        let page = app.new_page();

        match page.load().await {
            PageState::Failed(error) => assert_eq!(error.reason, "missing client identifier"),
            other => panic!("Expected failure, got {other}"),
        }
        assert!(matches!(page.load().await, PageState::Failed(_)));
    }

    #[tokio::test]
    async fn test_logout_resets_page() {
        let identity = Arc::new(StaticIdentity::new().with_active(alice()));
        let app = App::new(config(&[]), identity.clone());
        let page = app.new_page();
        let _ = page.load().await;

        let redirect = page.logout().await.unwrap();
        assert_eq!(redirect.kind(), RedirectKind::Logout);
        assert!(matches!(page.state(), PageState::SignedOut));
        assert!(identity.get_active_account().is_none());
    }

    #[tokio::test]
    async fn test_reload_after_redirect() {
        let identity = Arc::new(StaticIdentity::new());
        let app = App::new(config(&[]), identity.clone());

        let first = app.new_page();
        assert!(matches!(first.load().await, PageState::SignedOut));
        let _redirect = first.login().await.unwrap();
        drop(first);

        // The provider sent the user back with an account
        let identity = Arc::new(StaticIdentity::new().with_pending_redirect(bob()));
        let app = App::new(config(&[]), identity.clone());
        let second = app.new_page();
        match second.load().await {
            PageState::SignedIn { session, .. } => {
                assert_eq!(session.status, SessionStatus::Authenticated);
                assert_eq!(session.account(), Some(&bob()));
            }
            other => panic!("Expected signed in, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_endpoint_yields_error_reply() {
        let identity = Arc::new(StaticIdentity::new().with_active(alice()));
        let app = App::new(config(&[]), identity);
        let page = app.new_page();
        let _ = page.load().await;

        let chat = page.chat().unwrap();
        match chat.submit("hello").await {
            simplechat_chat::SubmitOutcome::Failed(message) => assert!(message.is_error_reply()),
            other => panic!("Expected failure, got {other:?}"),
        }
    }
}
