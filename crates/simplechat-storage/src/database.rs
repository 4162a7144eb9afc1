//! Credential cache database
//!
//! One SQLite file per data directory. Refresh tokens live here, so the file
//! is created readable by the owner only.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::migrations::run_migrations;
use crate::Result;

/// How long a write waits for another SimpleChat process holding the file
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open the cache at `path`, creating the file and its directory if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        restrict_permissions(path)?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        tracing::debug!(path = %path.display(), journal = %journal, "Opened credential cache");

        Self::prepare(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        // Removing an account cascades to its refresh token and active marker
        conn.pragma_update(None, "foreign_keys", "ON")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Home account id of the account marked active, if it is still cached
    pub fn active_account_id(&self) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let id = conn
                .query_row(
                    "SELECT home_account_id FROM active_account WHERE slot = 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    /// Mark a cached account active. The account row must already exist.
    pub fn set_active_account_id(&self, home_account_id: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO active_account (slot, home_account_id, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(slot) DO UPDATE SET
                    home_account_id = excluded.home_account_id,
                    updated_at = excluded.updated_at",
                rusqlite::params![home_account_id, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn clear_active_account_id(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM active_account", [])?;
            Ok(())
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::CachedAccount;

    fn alice() -> CachedAccount {
        CachedAccount {
            home_account_id: "a.t".to_string(),
            username: "alice@contoso.com".to_string(),
            name: "Alice".to_string(),
            tenant_id: "t".to_string(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            let count: i32 =
                conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.active_account_id().unwrap(), None);
    }

    #[test]
    fn test_active_account_marker() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_account(&alice()).unwrap();

        db.set_active_account_id("a.t").unwrap();
        db.set_active_account_id("a.t").unwrap();
        assert_eq!(db.active_account_id().unwrap(), Some("a.t".to_string()));

        db.clear_active_account_id().unwrap();
        assert_eq!(db.active_account_id().unwrap(), None);
    }

    #[test]
    fn test_unknown_account_cannot_be_active() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.set_active_account_id("missing.t").is_err());
        assert_eq!(db.active_account_id().unwrap(), None);
    }

    #[test]
    fn test_removing_account_clears_marker() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_account(&alice()).unwrap();
        db.set_active_account_id("a.t").unwrap();

        db.remove_account("a.t").unwrap();
        assert_eq!(db.active_account_id().unwrap(), None);
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        {
            let db = Database::open(&path).unwrap();
            db.upsert_account(&alice()).unwrap();
            db.set_active_account_id("a.t").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.active_account_id().unwrap(), Some("a.t".to_string()));
        assert_eq!(db.list_accounts().unwrap(), vec![alice()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        Database::open(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
