// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Consent stores — remember that the user allowed camera access, with an
// expiry, so the platform prompt is not shown on every session.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use scanwerk_core::error::{Result, ScanwerkError};

use crate::traits::ConsentStore;

/// Expiry `ttl` from now, saturating at the far future.
fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Process-lifetime consent store.
#[derive(Debug, Default)]
pub struct MemoryConsentStore {
    grants: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl MemoryConsentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConsentStore for MemoryConsentStore {
    fn is_granted(&self, key: &str) -> Result<bool> {
        let grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        Ok(grants.get(key).is_some_and(|expires| *expires > Utc::now()))
    }

    fn grant(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        grants.insert(key.to_owned(), expiry_from_now(ttl));
        Ok(())
    }

    fn revoke(&self, key: &str) -> Result<()> {
        let mut grants = self.grants.lock().unwrap_or_else(|e| e.into_inner());
        grants.remove(key);
        Ok(())
    }
}

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS consent (
        key TEXT PRIMARY KEY,
        granted_at TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    )
"#;

/// Consent store that survives restarts, backed by SQLite.
///
/// `rusqlite::Connection` is not `Sync`, so it sits behind a mutex. Calls are
/// synchronous; wrap them in `spawn_blocking` from async code if the
/// database lives on slow storage.
pub struct SqliteConsentStore {
    conn: Mutex<Connection>,
}

impl SqliteConsentStore {
    /// Open (or create) the consent database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| ScanwerkError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| ScanwerkError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| ScanwerkError::Database(format!("create table: {e}")))?;

        info!("consent database opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ScanwerkError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| ScanwerkError::Database(format!("create table: {e}")))?;

        debug!("in-memory consent database opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Drop every expired grant. Returns how many rows were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let removed = conn
            .execute(
                "DELETE FROM consent WHERE expires_at <= ?1",
                params![Utc::now().timestamp_millis()],
            )
            .map_err(|e| ScanwerkError::Database(format!("purge: {e}")))?;
        debug!(removed, "expired consent purged");
        Ok(removed)
    }
}

impl ConsentStore for SqliteConsentStore {
    fn is_granted(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let expires: Option<i64> = conn
            .query_row(
                "SELECT expires_at FROM consent WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ScanwerkError::Database(format!("query: {e}")))?;

        Ok(expires.is_some_and(|ms| ms > Utc::now().timestamp_millis()))
    }

    #[instrument(skip(self))]
    fn grant(&self, key: &str, ttl: Duration) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO consent (key, granted_at, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET granted_at = ?2, expires_at = ?3",
            params![
                key,
                Utc::now().to_rfc3339(),
                expiry_from_now(ttl).timestamp_millis()
            ],
        )
        .map_err(|e| ScanwerkError::Database(format!("grant: {e}")))?;
        debug!("consent recorded");
        Ok(())
    }

    #[instrument(skip(self))]
    fn revoke(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM consent WHERE key = ?1", params![key])
            .map_err(|e| ScanwerkError::Database(format!("revoke: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    fn exercise(store: &dyn ConsentStore) {
        assert!(!store.is_granted("camera").unwrap());

        store.grant("camera", YEAR).unwrap();
        assert!(store.is_granted("camera").unwrap());
        assert!(!store.is_granted("microphone").unwrap());

        // Re-granting refreshes rather than duplicating.
        store.grant("camera", YEAR).unwrap();
        assert!(store.is_granted("camera").unwrap());

        store.revoke("camera").unwrap();
        assert!(!store.is_granted("camera").unwrap());

        // Revoking something never granted is fine.
        store.revoke("camera").unwrap();
    }

    #[test]
    fn memory_store_grant_and_revoke() {
        exercise(&MemoryConsentStore::new());
    }

    #[test]
    fn sqlite_store_grant_and_revoke() {
        exercise(&SqliteConsentStore::open_in_memory().unwrap());
    }

    #[test]
    fn zero_ttl_is_already_expired() {
        let memory = MemoryConsentStore::new();
        memory.grant("camera", Duration::ZERO).unwrap();
        assert!(!memory.is_granted("camera").unwrap());

        let sqlite = SqliteConsentStore::open_in_memory().unwrap();
        sqlite.grant("camera", Duration::ZERO).unwrap();
        assert!(!sqlite.is_granted("camera").unwrap());
        assert_eq!(sqlite.purge_expired().unwrap(), 1);
    }

    #[test]
    fn huge_ttl_saturates() {
        let store = MemoryConsentStore::new();
        store.grant("camera", Duration::MAX).unwrap();
        assert!(store.is_granted("camera").unwrap());
    }

    #[test]
    fn sqlite_grant_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consent.db");

        SqliteConsentStore::open(&path)
            .unwrap()
            .grant("camera", YEAR)
            .unwrap();

        let reopened = SqliteConsentStore::open(&path).unwrap();
        assert!(reopened.is_granted("camera").unwrap());
    }
}
