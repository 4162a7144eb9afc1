//! Token endpoint wire types

use serde::Deserialize;

use crate::error::IdentityError;

/// OAuth error codes that only the user can resolve
const INTERACTION_ERRORS: &[&str] = &[
    "invalid_grant",
    "interaction_required",
    "login_required",
    "consent_required",
];

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Deserialize)]
pub(crate) struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl From<OAuthErrorResponse> for IdentityError {
    fn from(response: OAuthErrorResponse) -> Self {
        let description = response.error_description.unwrap_or_default();
        if INTERACTION_ERRORS.contains(&response.error.as_str()) {
            IdentityError::InteractionRequired(format!("{}: {}", response.error, description))
        } else {
            IdentityError::Provider {
                code: response.error,
                description,
            }
        }
    }
}
