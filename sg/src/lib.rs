//! Skyglow - nighttime-light monitoring control loop
//!
//! Skyglow watches per-region radiance readings for anomalous brightness,
//! raises alerts, dispatches notifications exactly once per alert, and
//! estimates the impact of proposed mitigations. The loop runs one explicit
//! Sense -> Reason -> Act -> Learn cycle per trigger; cadence is left to the
//! caller.
//!
//! # Core Guarantees
//!
//! - **Deterministic scoring**: hotspot detection is a pure function of the
//!   reading batch
//! - **Idempotent dispatch**: an alert's `sent_at` transitions exactly once,
//!   via a conditional update at the storage boundary
//! - **Balanced queue depth**: every cycle decrements what it incremented,
//!   on success and failure paths alike
//!
//! # Modules
//!
//! - [`detector`] - upper-quartile hotspot scoring
//! - [`estimator`] - mitigation impact arithmetic
//! - [`notify`] - notification channels and the alert notifier
//! - [`r#loop`] - the cycle driver
//! - [`state`] - store actor and loop state tracker
//! - [`seed`] - deterministic synthetic dataset generation

pub mod cli;
pub mod config;
pub mod detector;
pub mod domain;
pub mod estimator;
pub mod notify;
pub mod seed;
pub mod source;
pub mod state;

// Note: 'loop' is a reserved keyword, so we use r#loop
#[path = "loop/mod.rs"]
pub mod r#loop;

// Re-export commonly used types
pub use config::{Config, NotifyConfig, StorageConfig};
pub use detector::detect;
pub use domain::{Alert, CycleEvent, HotspotCandidate, Phase, PhaseStatus, RegionReading, Severity};
pub use estimator::{
    BASELINE_RADIANCE, MAX_DROP_FRACTION, MitigationEstimate, MitigationRequest, ValidationError,
    estimate,
};
pub use notify::{ChannelError, LogChannel, NotificationChannel, Notifier, NotifyReport};
pub use r#loop::{CycleDriver, CycleReport};
pub use seed::{SeedDataset, build_seed_data};
pub use source::{MetricError, MetricSource, StoreMetricSource};
pub use state::{
    LoopState, LoopTracker, MarkOutcome, StateCommand, StateError, StateManager, StateResponse,
};
