//! Core Store implementation
//!
//! Owns the SQLite connection and the schema. All writes go through `&mut
//! self` so a single owner (the daemon's state actor) serializes access;
//! `mark_sent_if_unsent` is the one conditional update, backing the
//! at-most-once dispatch guarantee.

use eyre::{Context, Result};
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{Alert, CycleEvent, MetricSample};

/// Alert totals reported by the status surface
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct AlertCounts {
    /// All alerts ever created
    pub total: u64,
    /// Alerts still awaiting dispatch
    pub unsent: u64,
}

/// The skyglow persistence layer
pub struct Store {
    conn: Connection,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl Store {
    /// Open or create a store in the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let db_path = dir.join("skyglow.db");
        let conn = Connection::open(&db_path)
            .context(format!("Failed to open database at {}", db_path.display()))?;

        let store = Self { conn, db_path };
        store.init_schema()?;
        debug!(dir = %dir.display(), "Opened glowstore");
        Ok(store)
    }

    /// In-memory store for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS alerts (
                     id         TEXT PRIMARY KEY,
                     code       TEXT NOT NULL,
                     severity   TEXT NOT NULL,
                     message    TEXT NOT NULL,
                     created_at INTEGER NOT NULL,
                     sent_at    INTEGER
                 );
                 CREATE INDEX IF NOT EXISTS idx_alerts_sent_at ON alerts (sent_at);
                 CREATE TABLE IF NOT EXISTS metrics (
                     code        TEXT NOT NULL,
                     observed_at INTEGER NOT NULL,
                     radiance    REAL NOT NULL,
                     PRIMARY KEY (code, observed_at)
                 );
                 CREATE TABLE IF NOT EXISTS events (
                     id      TEXT PRIMARY KEY,
                     phase   TEXT NOT NULL,
                     status  TEXT NOT NULL,
                     message TEXT NOT NULL,
                     at      INTEGER NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_events_at ON events (at);",
            )
            .context("Failed to initialize schema")?;
        Ok(())
    }

    // === Alerts ===

    /// Persist a new alert, returning its ID
    pub fn create_alert(&mut self, alert: Alert) -> Result<String> {
        self.conn
            .execute(
                "INSERT INTO alerts (id, code, severity, message, created_at, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    alert.id,
                    alert.code,
                    alert.severity,
                    alert.message,
                    alert.created_at,
                    alert.sent_at
                ],
            )
            .context("Failed to insert alert")?;
        debug!(id = %alert.id, code = %alert.code, "Alert created");
        Ok(alert.id)
    }

    /// Fetch one alert by ID
    pub fn get_alert(&self, id: &str) -> Result<Option<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, severity, message, created_at, sent_at
             FROM alerts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], row_to_alert)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// All alerts, newest first
    pub fn list_alerts(&self) -> Result<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, severity, message, created_at, sent_at
             FROM alerts ORDER BY created_at DESC",
        )?;
        let alerts = stmt
            .query_map([], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Alerts awaiting dispatch, oldest first
    pub fn list_unsent(&self) -> Result<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, severity, message, created_at, sent_at
             FROM alerts WHERE sent_at IS NULL ORDER BY created_at ASC",
        )?;
        let alerts = stmt
            .query_map([], row_to_alert)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(alerts)
    }

    /// Mark an alert sent, but only if it has not been sent already.
    ///
    /// Returns the number of rows updated: 1 when this call won the
    /// transition, 0 when another caller already marked it (or the ID does
    /// not exist). The zero case is expected under concurrent notifier runs
    /// and is not an error.
    pub fn mark_sent_if_unsent(&mut self, id: &str, ts_ms: i64) -> Result<usize> {
        let updated = self
            .conn
            .execute(
                "UPDATE alerts SET sent_at = ?2 WHERE id = ?1 AND sent_at IS NULL",
                params![id, ts_ms],
            )
            .context("Failed to mark alert sent")?;
        debug!(%id, updated, "mark_sent_if_unsent");
        Ok(updated)
    }

    /// Alert totals for the status surface
    pub fn alert_counts(&self) -> Result<AlertCounts> {
        let total: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get::<_, i64>(0))?
            as u64;
        let unsent: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM alerts WHERE sent_at IS NULL",
            [],
            |row| row.get::<_, i64>(0),
        )? as u64;
        Ok(AlertCounts { total, unsent })
    }

    // === Metrics ===

    /// Insert (or replace) one radiance sample
    pub fn insert_metric(&mut self, sample: &MetricSample) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metrics (code, observed_at, radiance)
                 VALUES (?1, ?2, ?3)",
                params![sample.code, sample.observed_at, sample.radiance],
            )
            .context("Failed to insert metric")?;
        Ok(())
    }

    /// Insert a batch of samples in one transaction
    pub fn insert_metrics(&mut self, samples: &[MetricSample]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO metrics (code, observed_at, radiance)
                 VALUES (?1, ?2, ?3)",
            )?;
            for sample in samples {
                stmt.execute(params![sample.code, sample.observed_at, sample.radiance])?;
            }
        }
        tx.commit().context("Failed to commit metric batch")?;
        info!(count = samples.len(), "Inserted metric batch");
        Ok(samples.len())
    }

    /// The most recent radiance sample for every region, ordered by code
    pub fn latest_readings(&self) -> Result<Vec<MetricSample>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.code, m.observed_at, m.radiance
             FROM metrics m
             JOIN (SELECT code, MAX(observed_at) AS latest
                   FROM metrics GROUP BY code) x
               ON m.code = x.code AND m.observed_at = x.latest
             ORDER BY m.code ASC",
        )?;
        let samples = stmt
            .query_map([], |row| {
                Ok(MetricSample {
                    code: row.get(0)?,
                    observed_at: row.get(1)?,
                    radiance: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(samples)
    }

    // === Cycle events ===

    /// Persist one phase outcome
    pub fn record_event(&mut self, event: CycleEvent) -> Result<String> {
        self.conn
            .execute(
                "INSERT INTO events (id, phase, status, message, at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![event.id, event.phase, event.status, event.message, event.at],
            )
            .context("Failed to insert event")?;
        Ok(event.id)
    }

    /// Most recent events, newest first
    pub fn recent_events(&self, limit: usize) -> Result<Vec<CycleEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, status, message, at
             FROM events ORDER BY at DESC, id DESC LIMIT ?1",
        )?;
        let events = stmt
            .query_map(params![limit as i64], |row| {
                Ok(CycleEvent {
                    id: row.get(0)?,
                    phase: row.get(1)?,
                    status: row.get(2)?,
                    message: row.get(3)?,
                    at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        code: row.get(1)?,
        severity: row.get(2)?,
        message: row.get(3)?,
        created_at: row.get(4)?,
        sent_at: row.get(5)?,
    })
}
