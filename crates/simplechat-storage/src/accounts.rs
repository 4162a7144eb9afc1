//! Cached accounts and refresh tokens

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::Result;

/// An account row as the identity client last saw it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    pub home_account_id: String,
    pub username: String,
    pub name: String,
    pub tenant_id: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub home_account_id: String,
    pub secret: String,
    pub scopes: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for RefreshTokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenRecord")
            .field("home_account_id", &self.home_account_id)
            .field("secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A stored text column that does not decode
fn conversion_error<E>(column: usize, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

impl Database {
    /// Insert or update an account, keeping its original position.
    pub fn upsert_account(&self, account: &CachedAccount) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO accounts (home_account_id, username, name, tenant_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(home_account_id) DO UPDATE SET
                    username = excluded.username,
                    name = excluded.name,
                    tenant_id = excluded.tenant_id,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    account.home_account_id,
                    account.username,
                    account.name,
                    account.tenant_id,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    /// All cached accounts in the order they were first stored
    pub fn list_accounts(&self) -> Result<Vec<CachedAccount>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT home_account_id, username, name, tenant_id FROM accounts ORDER BY seq",
            )?;

            let accounts = stmt
                .query_map([], |row| {
                    Ok(CachedAccount {
                        home_account_id: row.get(0)?,
                        username: row.get(1)?,
                        name: row.get(2)?,
                        tenant_id: row.get(3)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(accounts)
        })
    }

    /// Remove an account together with its refresh token
    pub fn remove_account(&self, home_account_id: &str) -> Result<()> {
        self.transaction(|conn| {
            conn.execute(
                "DELETE FROM refresh_tokens WHERE home_account_id = ?1",
                [home_account_id],
            )?;
            conn.execute(
                "DELETE FROM accounts WHERE home_account_id = ?1",
                [home_account_id],
            )?;
            Ok(())
        })?;

        tracing::debug!(account = %home_account_id, "Removed cached account");
        Ok(())
    }

    pub fn save_refresh_token(&self, record: &RefreshTokenRecord) -> Result<()> {
        let scopes_json = serde_json::to_string(&record.scopes)?;
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO refresh_tokens (home_account_id, secret, scopes, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    record.home_account_id,
                    record.secret,
                    scopes_json,
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn refresh_token(&self, home_account_id: &str) -> Result<Option<RefreshTokenRecord>> {
        self.with_connection(|conn| {
            let record = conn
                .query_row(
                    "SELECT home_account_id, secret, scopes, updated_at
                     FROM refresh_tokens WHERE home_account_id = ?1",
                    [home_account_id],
                    |row| {
                        let scopes_json: String = row.get(2)?;
                        let scopes: Vec<String> = serde_json::from_str(&scopes_json)
                            .map_err(|e| conversion_error(2, e))?;

                        let updated_str: String = row.get(3)?;
                        let updated_at = DateTime::parse_from_rfc3339(&updated_str)
                            .map(|dt| dt.with_timezone(&Utc))
                            .map_err(|e| conversion_error(3, e))?;

                        Ok(RefreshTokenRecord {
                            home_account_id: row.get(0)?,
                            secret: row.get(1)?,
                            scopes,
                            updated_at,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn delete_refresh_token(&self, home_account_id: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM refresh_tokens WHERE home_account_id = ?1",
                [home_account_id],
            )?;
            Ok(())
        })
    }
}
