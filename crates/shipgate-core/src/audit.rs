//! Append-only audit ledger backed by SQLite.
//!
//! Records are inserted one statement at a time on the blocking pool and are
//! never updated or deleted. [`AuditLog::log`] is the best-effort entry point
//! used by the orchestrator and the approval registry; a failed write is
//! logged and dropped.

use crate::error::{Result, ShipgateError};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS audit_log (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    user      TEXT NOT NULL,
    action    TEXT NOT NULL,
    app       TEXT NOT NULL,
    details   TEXT NOT NULL,
    result    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_log_app ON audit_log (app, id);
";

/// One history row, with the stored result reduced to its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub user: String,
    pub action: String,
    pub result: String,
}

#[derive(Clone)]
pub struct AuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        crate::io::ensure_parent(path)?;
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ShipgateError::Audit("connection lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| ShipgateError::Audit(format!("audit task failed: {e}")))?
    }

    /// Append one record and return its row id.
    pub async fn record<R: Serialize>(
        &self,
        user: &str,
        action: &str,
        app: &str,
        details: Value,
        result: &R,
    ) -> Result<i64> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let details = serde_json::to_string(&details)?;
        let result = serde_json::to_string(result)?;
        let (user, action, app) = (user.to_string(), action.to_string(), app.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (timestamp, user, action, app, details, result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![timestamp, user, action, app, details, result],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Append one record, logging instead of returning any failure.
    pub async fn log<R: Serialize>(
        &self,
        user: &str,
        action: &str,
        app: &str,
        details: Value,
        result: &R,
    ) {
        if let Err(e) = self.record(user, action, app, details, result).await {
            tracing::error!(user, action, app, error = %e, "audit write failed");
        }
    }

    /// At most `limit` records for `app`, newest first.
    pub async fn get_history(&self, app: &str, limit: u32) -> Result<Vec<HistoryEntry>> {
        let app = app.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, user, action, result FROM audit_log
                 WHERE app = ?1 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![app, limit], |row| {
                let result: String = row.get(3)?;
                Ok(HistoryEntry {
                    timestamp: row.get(0)?,
                    user: row.get(1)?,
                    action: row.get(2)?,
                    result: result_status(&result),
                })
            })?;
            let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    /// Total number of records across all apps.
    pub async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }
}

fn result_status(stored: &str) -> String {
    serde_json::from_str::<Value>(stored)
        .ok()
        .and_then(|v| v.get("status").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
