//! Microsoft identity platform client
//!
//! Authorization code flow with PKCE against the v2 endpoints of the
//! configured authority. Accounts and refresh tokens live in the SQLite
//! credential cache; access tokens only in memory.

mod claims;
mod pkce;
mod protocol;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use url::Url;
use uuid::Uuid;

use simplechat_storage::{CachedAccount, Database, RefreshTokenRecord};

use crate::account::Account;
use crate::client::IdentityClient;
use crate::error::{IdentityError, InitializationError};
use crate::redirect::{Redirect, RedirectKind};
use crate::scope::ScopeSet;
use crate::token::TokenHandle;
use crate::Result;

use claims::IdTokenClaims;
use pkce::Pkce;
use protocol::{OAuthErrorResponse, TokenResponse};

/// Scopes requested on sign-in
const LOGIN_SCOPES: &[&str] = &["openid", "profile", "offline_access", "User.Read"];

/// Added to every interactive token request so the response carries an
/// ID token and a refresh token
const OIDC_SCOPES: &[&str] = &["openid", "profile", "offline_access"];

/// Cached access tokens must outlive this margin to be handed out
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct EntraConfig {
    pub client_id: String,
    /// e.g. `https://login.microsoftonline.com/<tenant>`
    pub authority: String,
    pub redirect_uri: String,
    /// Defaults to `redirect_uri`
    pub post_logout_redirect_uri: Option<String>,
}

#[derive(Debug, Clone)]
struct Endpoints {
    authorize: Url,
    token: Url,
    logout: Url,
    redirect: Url,
    post_logout: Url,
}

impl Endpoints {
    fn from_config(config: &EntraConfig) -> std::result::Result<Self, InitializationError> {
        let authority = Url::parse(config.authority.trim_end_matches('/')).map_err(|e| {
            InitializationError::new(format!("invalid authority {}: {e}", config.authority))
        })?;

        let has_tenant = authority
            .path_segments()
            .map(|mut segments| segments.any(|s| !s.is_empty()))
            .unwrap_or(false);
        if !has_tenant {
            return Err(InitializationError::new(format!(
                "authority {} has no tenant",
                config.authority
            )));
        }

        let endpoint = |suffix: &str| {
            Url::parse(&format!("{}/oauth2/v2.0/{suffix}", authority.as_str().trim_end_matches('/')))
                .map_err(|e| InitializationError::new(e.to_string()))
        };

        let redirect = Url::parse(&config.redirect_uri).map_err(|e| {
            InitializationError::new(format!("invalid redirect uri {}: {e}", config.redirect_uri))
        })?;
        let post_logout = match &config.post_logout_redirect_uri {
            Some(uri) => Url::parse(uri).map_err(|e| {
                InitializationError::new(format!("invalid post-logout redirect uri {uri}: {e}"))
            })?,
            None => redirect.clone(),
        };

        Ok(Self {
            authorize: endpoint("authorize")?,
            token: endpoint("token")?,
            logout: endpoint("logout")?,
            redirect,
            post_logout,
        })
    }
}

struct PendingAuthorization {
    state: String,
    verifier: String,
    scopes: ScopeSet,
}

#[derive(Default)]
struct ClientState {
    /// Set once `initialize` succeeded
    endpoints: Option<Endpoints>,
    accounts: Vec<Account>,
    active: Option<String>,
    access_tokens: HashMap<String, Vec<TokenHandle>>,
    pending: Option<PendingAuthorization>,
    /// Location the provider redirected the user agent to
    delivered: Option<Url>,
}

pub struct EntraClient {
    config: EntraConfig,
    db: Database,
    http: reqwest::Client,
    state: RwLock<ClientState>,
}

impl EntraClient {
    pub fn new(config: EntraConfig, db: Database) -> Self {
        Self {
            config,
            db,
            http: reqwest::Client::new(),
            state: RwLock::new(ClientState::default()),
        }
    }

    /// Hand over the URL the provider redirected to. Consumed by the next
    /// `handle_redirect_response`.
    pub fn receive_redirect(&self, location: Url) {
        tracing::debug!(path = %location.path(), "Redirect response received");
        self.state.write().delivered = Some(location);
    }

    /// The configured redirect URI, once initialized
    pub fn redirect_uri(&self) -> Option<Url> {
        self.state
            .read()
            .endpoints
            .as_ref()
            .map(|e| e.redirect.clone())
    }

    fn endpoints(&self) -> Result<Endpoints> {
        self.state
            .read()
            .endpoints
            .clone()
            .ok_or(IdentityError::NotInitialized)
    }

    fn begin_authorization(
        &self,
        scopes: ScopeSet,
        login_hint: Option<&str>,
        kind: RedirectKind,
    ) -> Result<Redirect> {
        let endpoints = self.endpoints()?;
        let pkce = Pkce::generate();
        let state = Uuid::new_v4().to_string();

        let mut url = endpoints.authorize;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", endpoints.redirect.as_str())
                .append_pair("response_mode", "query")
                .append_pair("scope", &scopes.to_scope_string())
                .append_pair("state", &state)
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", "S256");
            if let Some(hint) = login_hint.filter(|h| !h.is_empty()) {
                query.append_pair("login_hint", hint);
            }
        }

        self.state.write().pending = Some(PendingAuthorization {
            state,
            verifier: pkce.verifier,
            scopes,
        });

        tracing::info!(kind = %kind, "Starting interactive authorization");

        Ok(Redirect::new(url, kind))
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let endpoints = self.endpoints()?;

        let response = self.http.post(endpoints.token).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| IdentityError::UnexpectedResponse(e.to_string()));
        }

        match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(error) => Err(error.into()),
            Err(_) => Err(IdentityError::UnexpectedResponse(format!("HTTP {status}"))),
        }
    }

    /// Cache what the token endpoint handed back and return the account and
    /// access token it belongs to
    fn store_token_response(
        &self,
        response: TokenResponse,
        requested: &ScopeSet,
        known_account: Option<&Account>,
    ) -> Result<(Account, TokenHandle)> {
        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                IdentityError::UnexpectedResponse(format!(
                    "token lifetime out of range: {}",
                    response.expires_in
                ))
            })?;

        let account = match &response.id_token {
            Some(id_token) => IdTokenClaims::decode(id_token)?.into_account()?,
            None => known_account.cloned().ok_or_else(|| {
                IdentityError::UnexpectedResponse("token response has no id_token".to_string())
            })?,
        };

        self.db.upsert_account(&CachedAccount::from(&account))?;

        let granted = ScopeSet::parse(response.scope.as_deref().unwrap_or_default());
        let scopes = requested.union(&granted);

        if let Some(secret) = response.refresh_token {
            self.db.save_refresh_token(&RefreshTokenRecord {
                home_account_id: account.home_account_id.clone(),
                secret,
                scopes: scopes.iter().map(str::to_string).collect(),
                updated_at: Utc::now(),
            })?;
        }

        let token = TokenHandle::new(response.access_token, scopes, expires_at);

        {
            let mut state = self.state.write();
            match state
                .accounts
                .iter_mut()
                .find(|a| a.home_account_id == account.home_account_id)
            {
                Some(existing) => *existing = account.clone(),
                None => state.accounts.push(account.clone()),
            }

            let now = Utc::now();
            let tokens = state
                .access_tokens
                .entry(account.home_account_id.clone())
                .or_default();
            tokens.retain(|t| t.expires_at() > now && t.scopes() != token.scopes());
            tokens.push(token.clone());
        }

        Ok((account, token))
    }

    fn cached_access_token(&self, home_account_id: &str, scopes: &ScopeSet) -> Option<TokenHandle> {
        let margin = Duration::seconds(EXPIRY_MARGIN_SECS);
        self.state
            .read()
            .access_tokens
            .get(home_account_id)?
            .iter()
            .find(|t| t.covers(scopes, margin))
            .cloned()
    }

    fn forget_account(&self, home_account_id: &str) -> Result<()> {
        self.db.remove_account(home_account_id)?;

        let mut state = self.state.write();
        state.accounts.retain(|a| a.home_account_id != home_account_id);
        state.access_tokens.remove(home_account_id);
        Ok(())
    }
}

#[async_trait]
impl IdentityClient for EntraClient {
    async fn initialize(&self) -> Result<()> {
        if self.state.read().endpoints.is_some() {
            return Ok(());
        }

        if self.config.client_id.trim().is_empty() {
            return Err(InitializationError::new("missing client identifier").into());
        }
        let endpoints = Endpoints::from_config(&self.config)?;

        let accounts: Vec<Account> = self
            .db
            .list_accounts()?
            .into_iter()
            .map(Account::from)
            .collect();
        let active = self
            .db
            .active_account_id()?
            .filter(|id| accounts.iter().any(|a| &a.home_account_id == id));

        let account_count = accounts.len();
        {
            let mut state = self.state.write();
            state.accounts = accounts;
            state.active = active;
            state.endpoints = Some(endpoints);
        }

        tracing::info!(
            authority = %self.config.authority,
            cached_accounts = account_count,
            "Identity client initialized"
        );

        Ok(())
    }

    async fn handle_redirect_response(&self) -> Result<Option<Account>> {
        let endpoints = self.endpoints()?;

        let (location, pending) = {
            let mut state = self.state.write();
            let Some(location) = state.delivered.take() else {
                return Ok(None);
            };
            (location, state.pending.take())
        };

        let params: HashMap<String, String> = location.query_pairs().into_owned().collect();

        if let Some(code) = params.get("error") {
            return Err(IdentityError::Provider {
                code: code.clone(),
                description: params.get("error_description").cloned().unwrap_or_default(),
            });
        }

        let pending = pending.ok_or(IdentityError::NoPendingRequest)?;
        if params.get("state") != Some(&pending.state) {
            return Err(IdentityError::StateMismatch);
        }
        let code = params.get("code").ok_or(IdentityError::MissingCode)?;

        let scope = pending.scopes.to_scope_string();
        let response = self
            .request_token(&[
                ("client_id", self.config.client_id.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", endpoints.redirect.as_str()),
                ("code_verifier", pending.verifier.as_str()),
                ("scope", scope.as_str()),
            ])
            .await?;

        let (account, _) = self.store_token_response(response, &pending.scopes, None)?;
        self.set_active_account(&account)?;

        tracing::info!(account = %account.home_account_id, "Interactive sign-in completed");

        Ok(Some(account))
    }

    fn get_active_account(&self) -> Option<Account> {
        let state = self.state.read();
        let active = state.active.as_deref()?;
        state
            .accounts
            .iter()
            .find(|a| a.home_account_id == active)
            .cloned()
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        self.state.read().accounts.clone()
    }

    fn set_active_account(&self, account: &Account) -> Result<()> {
        // The marker references the account row
        self.db.upsert_account(&CachedAccount::from(account))?;
        self.db.set_active_account_id(&account.home_account_id)?;

        let mut state = self.state.write();
        if !state
            .accounts
            .iter()
            .any(|a| a.home_account_id == account.home_account_id)
        {
            state.accounts.push(account.clone());
        }
        state.active = Some(account.home_account_id.clone());
        Ok(())
    }

    async fn acquire_token_silent(
        &self,
        scopes: &ScopeSet,
        account: &Account,
    ) -> Result<TokenHandle> {
        self.endpoints()?;

        if let Some(token) = self.cached_access_token(&account.home_account_id, scopes) {
            tracing::debug!(account = %account.home_account_id, "Access token served from cache");
            return Ok(token);
        }

        let record = self
            .db
            .refresh_token(&account.home_account_id)?
            .ok_or_else(|| {
                IdentityError::InteractionRequired("no refresh token cached".to_string())
            })?;

        let mut request_scopes = scopes.clone();
        request_scopes.insert("offline_access");
        let scope = request_scopes.to_scope_string();

        let response = self
            .request_token(&[
                ("client_id", self.config.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", record.secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .await?;

        let (_, token) = self.store_token_response(response, scopes, Some(account))?;

        tracing::debug!(account = %account.home_account_id, "Access token refreshed");

        Ok(token)
    }

    async fn acquire_token_interactive(&self, scopes: &ScopeSet) -> Result<Redirect> {
        let scopes = scopes.union(&OIDC_SCOPES.iter().copied().collect());
        let hint = self.get_active_account().map(|a| a.username);
        self.begin_authorization(scopes, hint.as_deref(), RedirectKind::Consent)
    }

    async fn login_interactive(&self) -> Result<Redirect> {
        self.begin_authorization(LOGIN_SCOPES.iter().copied().collect(), None, RedirectKind::Login)
    }

    async fn logout_interactive(&self) -> Result<Redirect> {
        let endpoints = self.endpoints()?;
        let active = self.get_active_account();

        match &active {
            Some(account) => self.forget_account(&account.home_account_id)?,
            None => {
                for account in self.get_all_accounts() {
                    self.forget_account(&account.home_account_id)?;
                }
            }
        }

        self.db.clear_active_account_id()?;
        {
            let mut state = self.state.write();
            state.active = None;
            state.pending = None;
        }

        let mut url = endpoints.logout;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("post_logout_redirect_uri", endpoints.post_logout.as_str());
            if let Some(account) = active.as_ref().filter(|a| !a.username.is_empty()) {
                query.append_pair("logout_hint", &account.username);
            }
        }

        tracing::info!(
            account = active.as_ref().map(|a| a.home_account_id.as_str()).unwrap_or("-"),
            "Signed out"
        );

        Ok(Redirect::new(url, RedirectKind::Logout))
    }
}
