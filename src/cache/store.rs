//! SQLite-backed response cache with time-based expiry.
//!
//! One table, one row per key. Rows past `expires_at` are never returned:
//! `get` deletes them on contact and `sweep` removes them in bulk. There is no
//! size bound and no LRU; expiry is purely time-based.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::types::{Error, Result};

/// Durable key → (JSON value, expiry) store.
///
/// Every operation is a single statement under a short-lived connection lock;
/// nothing here is held across an upstream fetch.
#[derive(Debug)]
pub struct PersistentCache {
    conn: Mutex<Connection>,
    default_ttl: Duration,
}

impl PersistentCache {
    /// Open (or create) the cache file and its schema.
    pub fn open(path: &Path, default_ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn, default_ttl)
    }

    pub fn open_in_memory(default_ttl: Duration) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, default_ttl)
    }

    fn with_connection(conn: Connection, default_ttl: Duration) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_expires_at ON cache(expires_at);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fetch a live value. An expired row is deleted and reported absent.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = now_millis();
        let conn = self.conn()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT data, expires_at FROM cache WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now {
            conn.execute("DELETE FROM cache WHERE key = ?1", [key])?;
            tracing::debug!(key = %short(key), "cache entry expired, removed");
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Upsert `value` under `key`. `None` uses the configured default TTL.
    pub fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.write(key, value, now_millis().saturating_add(ttl_ms))
    }

    /// Upsert `value` with an absolute expiry.
    pub fn set_until(&self, key: &str, value: &Value, expires_at: DateTime<Utc>) -> Result<()> {
        self.write(key, value, expires_at.timestamp_millis())
    }

    fn write(&self, key: &str, value: &Value, expires_at: i64) -> Result<()> {
        let data = serde_json::to_string(value)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO cache (key, data, expires_at) VALUES (?1, ?2, ?3)",
            (key, data, expires_at),
        )?;
        Ok(())
    }

    /// Remove `key`. Returns whether a row existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM cache WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    /// Delete every expired row. Returns the number removed.
    pub fn sweep(&self) -> Result<usize> {
        let now = now_millis();
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM cache WHERE expires_at <= ?1", [now])?;
        Ok(removed)
    }

    /// Raw existence check that ignores expiry and never deletes.
    pub fn contains_row(&self, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM cache WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Raw row count, expired rows included.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove all rows, live or expired.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM cache", [])?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage_state("cache connection mutex poisoned"))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn short(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}
