//! GlowStore - persistent state for the skyglow monitoring loop
//!
//! A small SQLite-backed store holding the three record families the
//! monitoring core reads and writes:
//!
//! - **Alerts** - hotspot alerts with a single `sent_at` transition
//! - **Metrics** - per-region radiance samples
//! - **Cycle events** - one row per loop phase outcome
//!
//! The store is deliberately not generic: the daemon crate owns the
//! behavior, this crate owns the rows and the SQL.

pub mod store;
pub mod types;

pub use store::{AlertCounts, Store};
pub use types::{Alert, CycleEvent, MetricSample, Phase, PhaseStatus, Severity};

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
