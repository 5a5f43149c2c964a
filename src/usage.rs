//! Anonymous usage metering.
//!
//! An append-only log of `(session_id, tool, timestamp, call_count)` rows.
//! Aggregates are computed on demand for a calendar month (UTC) and never
//! stored. Recording is isolated from the lookup it meters: `record` logs
//! storage failures instead of returning them.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::types::{Error, Result};

/// Per-session totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub session_id: String,
    pub month: u32,
    pub year: i32,
    pub total_calls: u64,
    pub per_tool: BTreeMap<String, u64>,
}

/// Totals across every session for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallUsage {
    pub month: u32,
    pub year: i32,
    pub total_calls: u64,
    pub unique_sessions: u64,
    pub per_tool: BTreeMap<String, u64>,
}

/// SQLite-backed usage log.
#[derive(Debug)]
pub struct UsageMeter {
    conn: Mutex<Connection>,
}

impl UsageMeter {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS usage (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                tool TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                call_count INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_usage_session_ts ON usage(session_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_usage_ts ON usage(timestamp);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one usage row, logging (not returning) any storage failure.
    pub fn record(&self, session_id: &str, tool: &str, call_count: u32) {
        if let Err(e) = self.try_record(session_id, tool, call_count) {
            tracing::warn!(tool, "failed to record usage: {}", e);
        }
    }

    pub fn try_record(&self, session_id: &str, tool: &str, call_count: u32) -> Result<()> {
        self.try_record_at(session_id, tool, call_count, Utc::now())
    }

    /// Append a row with an explicit timestamp.
    pub fn try_record_at(
        &self,
        session_id: &str,
        tool: &str,
        call_count: u32,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO usage (session_id, tool, timestamp, call_count) VALUES (?1, ?2, ?3, ?4)",
            (session_id, tool, at.timestamp_millis(), i64::from(call_count)),
        )?;
        Ok(())
    }

    /// Usage for `session_id` in the given month (defaults to the current UTC
    /// month and year).
    pub fn monthly_usage(
        &self,
        session_id: &str,
        month: Option<u32>,
        year: Option<i32>,
    ) -> Result<MonthlyUsage> {
        let (month, year, start, end) = month_window(month, year)?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT tool, SUM(call_count) FROM usage \
             WHERE session_id = ?1 AND timestamp >= ?2 AND timestamp < ?3 \
             GROUP BY tool",
        )?;
        let per_tool = collect_per_tool(stmt.query_map((session_id, start, end), tool_row)?)?;

        Ok(MonthlyUsage {
            session_id: session_id.to_string(),
            month,
            year,
            total_calls: per_tool.values().sum(),
            per_tool,
        })
    }

    /// Usage across all sessions in the given month.
    pub fn overall_usage(&self, month: Option<u32>, year: Option<i32>) -> Result<OverallUsage> {
        let (month, year, start, end) = month_window(month, year)?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT tool, SUM(call_count) FROM usage \
             WHERE timestamp >= ?1 AND timestamp < ?2 \
             GROUP BY tool",
        )?;
        let per_tool = collect_per_tool(stmt.query_map((start, end), tool_row)?)?;
        let unique_sessions: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT session_id) FROM usage WHERE timestamp >= ?1 AND timestamp < ?2",
            (start, end),
            |row| row.get(0),
        )?;

        Ok(OverallUsage {
            month,
            year,
            total_calls: per_tool.values().sum(),
            unique_sessions: u64::try_from(unique_sessions).unwrap_or(0),
            per_tool,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::storage_state("usage connection mutex poisoned"))
    }
}

fn tool_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, i64)> {
    Ok((row.get(0)?, row.get(1)?))
}

fn collect_per_tool<I>(rows: I) -> Result<BTreeMap<String, u64>>
where
    I: Iterator<Item = rusqlite::Result<(String, i64)>>,
{
    let mut per_tool = BTreeMap::new();
    for row in rows {
        let (tool, calls) = row?;
        per_tool.insert(tool, u64::try_from(calls).unwrap_or(0));
    }
    Ok(per_tool)
}

/// Resolve the month/year defaults and return `[month_start, next_month_start)`
/// in epoch milliseconds.
fn month_window(month: Option<u32>, year: Option<i32>) -> Result<(u32, i32, i64, i64)> {
    let now = Utc::now();
    let month = month.unwrap_or_else(|| now.month());
    let year = year.unwrap_or_else(|| now.year());
    if !(1..=12).contains(&month) {
        return Err(Error::validation(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let start = month_start_millis(year, month)?;
    let end = month_start_millis(next_year, next_month)?;
    Ok((month, year, start, end))
}

fn month_start_millis(year: i32, month: u32) -> Result<i64> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| Error::validation(format!("invalid month {year}-{month:02}")))
}
