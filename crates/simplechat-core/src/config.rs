//! Application configuration
//!
//! Read once from the environment at startup. Missing identity settings are
//! warnings here; the identity client reports them when it initializes.

use serde::Serialize;
use std::path::PathBuf;

use simplechat_identity::{EntraConfig, ScopeSet};

const DEFAULT_LOGIN_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8400";

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub client_id: Option<String>,
    /// `https://login.microsoftonline.com/<tenant>` unless overridden
    pub authority: Option<String>,
    pub redirect_uri: String,
    /// Empty means anonymous-but-authenticated mode
    pub api_scopes: ScopeSet,
    pub chat_api_url: Option<String>,
    #[serde(skip_serializing)]
    pub telemetry_connection_string: Option<String>,
    /// Holds the credential cache
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let authority = get("SIMPLECHAT_AUTHORITY").or_else(|| {
            get("SIMPLECHAT_TENANT_ID").map(|tenant| format!("{DEFAULT_LOGIN_HOST}/{tenant}"))
        });

        let data_dir = get("SIMPLECHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| dirs::data_dir(&lookup));

        Self {
            client_id: get("SIMPLECHAT_CLIENT_ID"),
            authority,
            redirect_uri: get("SIMPLECHAT_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            api_scopes: get("SIMPLECHAT_API_SCOPE")
                .map(|s| ScopeSet::parse(&s))
                .unwrap_or_default(),
            chat_api_url: get("SIMPLECHAT_CHAT_API_URL"),
            telemetry_connection_string: get("APPLICATIONINSIGHTS_CONNECTION_STRING"),
            data_dir,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("simplechat.db")
    }

    /// Settings for the identity client. Missing values are passed through
    /// empty so initialization fails with a clear reason.
    pub fn entra_config(&self) -> EntraConfig {
        EntraConfig {
            client_id: self.client_id.clone().unwrap_or_default(),
            authority: self.authority.clone().unwrap_or_default(),
            redirect_uri: self.redirect_uri.clone(),
            post_logout_redirect_uri: None,
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.client_id.is_none() {
            warnings.push("SIMPLECHAT_CLIENT_ID is not set; sign-in is unavailable".to_string());
        }
        if self.authority.is_none() {
            warnings.push(
                "SIMPLECHAT_TENANT_ID or SIMPLECHAT_AUTHORITY is not set; sign-in is unavailable"
                    .to_string(),
            );
        }
        if self.chat_api_url.is_none() {
            warnings.push("SIMPLECHAT_CHAT_API_URL is not set; prompts cannot be answered".to_string());
        }
        warnings
    }

    pub fn log_warnings(&self) {
        for warning in self.warnings() {
            tracing::warn!("{}", warning);
        }
    }
}

// Platform data directory
mod dirs {
    use std::path::PathBuf;

    const APP_DIR: &str = "SimpleChat";

    pub fn data_dir<F>(lookup: &F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        base_dir(lookup)
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".simplechat"))
    }

    fn base_dir<F>(lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        #[cfg(target_os = "windows")]
        {
            lookup("LOCALAPPDATA").map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            lookup("HOME").map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            lookup("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|| lookup("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        }
    }
}
