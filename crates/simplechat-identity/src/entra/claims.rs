//! ID token claims
//!
//! The ID token comes straight from the token endpoint over TLS, so only the
//! payload is decoded; the signature is not checked here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::account::Account;
use crate::error::IdentityError;
use crate::Result;

#[derive(Debug, Deserialize)]
pub(crate) struct IdTokenClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl IdTokenClaims {
    pub fn decode(id_token: &str) -> Result<Self> {
        let payload = id_token
            .split('.')
            .nth(1)
            .ok_or_else(|| IdentityError::InvalidIdToken("not a JWT".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidIdToken(e.to_string()))?;

        serde_json::from_slice(&bytes).map_err(|e| IdentityError::InvalidIdToken(e.to_string()))
    }

    pub fn into_account(self) -> Result<Account> {
        let object_id = self
            .oid
            .or(self.sub)
            .ok_or_else(|| IdentityError::InvalidIdToken("missing oid and sub".to_string()))?;
        let tenant_id = self.tid.unwrap_or_default();

        let home_account_id = if tenant_id.is_empty() {
            object_id
        } else {
            format!("{object_id}.{tenant_id}")
        };

        Ok(Account {
            home_account_id,
            username: self.preferred_username.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            tenant_id,
        })
    }
}
