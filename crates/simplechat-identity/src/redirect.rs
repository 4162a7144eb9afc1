//! Navigation away from the current flow
//!
//! Interactive identity operations end in a `Redirect`. Whoever receives one
//! must stop what it was doing and hand it to the page shell; control comes
//! back only through a fresh `SessionBootstrap` on the reloaded page.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectKind {
    /// Sign-in; the provider will redirect back with a code
    Login,
    /// Token escalation for additional scopes; also redirects back with a code
    Consent,
    /// Sign-out; nothing comes back
    Logout,
}

impl RedirectKind {
    /// Whether the provider sends the user back with a response to resolve
    pub fn expects_response(&self) -> bool {
        !matches!(self, RedirectKind::Logout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectKind::Login => "login",
            RedirectKind::Consent => "consent",
            RedirectKind::Logout => "logout",
        }
    }
}

impl std::fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[must_use = "a redirect ends the current flow and must be handed to the page shell"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    url: Url,
    kind: RedirectKind,
}

impl Redirect {
    pub fn new(url: Url, kind: RedirectKind) -> Self {
        Self { url, kind }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> RedirectKind {
        self.kind
    }
}
