//! Persisted record types
//!
//! Row shapes for the alerts, metrics, and events tables. Enum columns are
//! stored as lowercase text via their `ToSql`/`FromSql` impls.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::now_ms;

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Stable text form used for storage and display
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Severity {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Severity {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Self::from_name(s).ok_or(FromSqlError::InvalidType))
    }
}

/// A hotspot alert
///
/// Immutable once created, except for the single `sent_at` transition the
/// notifier applies on confirmed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier
    pub id: String,

    /// Region code the alert refers to
    pub code: String,

    /// Severity classification
    pub severity: Severity,

    /// Human-readable summary
    pub message: String,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Dispatch timestamp (Unix milliseconds); absent until sent
    #[serde(default)]
    pub sent_at: Option<i64>,
}

impl Alert {
    /// Create a new unsent alert with a generated ID
    pub fn new(code: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            code: code.into(),
            severity,
            message: message.into(),
            created_at: now_ms(),
            sent_at: None,
        }
    }

    /// Create with a specific ID (for tests and seed data)
    pub fn with_id(
        id: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            severity,
            message: message.into(),
            created_at: now_ms(),
            sent_at: None,
        }
    }

    /// Builder method to set the creation timestamp
    pub fn with_created_at(mut self, ts_ms: i64) -> Self {
        self.created_at = ts_ms;
        self
    }

    /// Whether this alert has already been dispatched
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}

/// Loop phase a cycle event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Sense,
    Reason,
    Act,
    Learn,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sense => "sense",
            Self::Reason => "reason",
            Self::Act => "act",
            Self::Learn => "learn",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "sense" => Some(Self::Sense),
            "reason" => Some(Self::Reason),
            "act" => Some(Self::Act),
            "learn" => Some(Self::Learn),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Phase {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Phase {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Self::from_name(s).ok_or(FromSqlError::InvalidType))
    }
}

/// Outcome recorded for a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Success,
    Error,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for PhaseStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for PhaseStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Self::from_name(s).ok_or(FromSqlError::InvalidType))
    }
}

/// One loop phase outcome, persisted for the activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleEvent {
    /// Unique identifier
    pub id: String,

    /// Phase that produced the event
    pub phase: Phase,

    /// Outcome of the phase
    pub status: PhaseStatus,

    /// Free-form detail (counts, error text)
    pub message: String,

    /// Event timestamp (Unix milliseconds)
    pub at: i64,
}

impl CycleEvent {
    /// Record a successful phase outcome
    pub fn success(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            phase,
            status: PhaseStatus::Success,
            message: message.into(),
            at: now_ms(),
        }
    }

    /// Record a failed phase outcome
    pub fn error(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            phase,
            status: PhaseStatus::Error,
            message: message.into(),
            at: now_ms(),
        }
    }

    /// Builder method to set the event timestamp
    pub fn with_at(mut self, ts_ms: i64) -> Self {
        self.at = ts_ms;
        self
    }
}

/// One radiance measurement for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Region code
    pub code: String,

    /// Observation timestamp (Unix milliseconds)
    pub observed_at: i64,

    /// Measured radiance (nW/cm²/sr)
    pub radiance: f64,
}

impl MetricSample {
    pub fn new(code: impl Into<String>, observed_at: i64, radiance: f64) -> Self {
        Self {
            code: code.into(),
            observed_at,
            radiance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_new_is_unsent() {
        let alert = Alert::new("North-abc", Severity::High, "radiance spike");
        assert!(!alert.is_sent());
        assert!(!alert.id.is_empty());
        assert_eq!(alert.severity, Severity::High);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_roundtrip_names() {
        for sev in [Severity::Low, Severity::Medium, Severity::High] {
            assert_eq!(Severity::from_name(sev.as_str()), Some(sev));
        }
        assert_eq!(Severity::from_name("extreme"), None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Sense.to_string(), "sense");
        assert_eq!(Phase::Learn.to_string(), "learn");
    }

    #[test]
    fn test_alert_serde() {
        let alert = Alert::with_id("al-1", "West-x1", Severity::Medium, "above threshold");
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"severity\":\"medium\""));

        let parsed: Alert = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, alert);
    }

    #[test]
    fn test_cycle_event_constructors() {
        let ok = CycleEvent::success(Phase::Reason, "2 alerts created");
        assert_eq!(ok.status, PhaseStatus::Success);

        let err = CycleEvent::error(Phase::Sense, "fetch failed");
        assert_eq!(err.status, PhaseStatus::Error);
        assert_eq!(err.phase, Phase::Sense);
    }
}
