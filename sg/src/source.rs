//! Metric source seam
//!
//! The Sense phase pulls readings through this trait. The store-backed
//! implementation serves the latest persisted sample per region; tests and
//! demos substitute their own sources. Fetch failures are transient: the
//! driver treats them as an empty batch for the cycle and retries on the
//! next trigger.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::RegionReading;
use crate::state::{StateError, StateManager};

/// Transient failure while acquiring readings
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("metric source unavailable: {0}")]
    Unavailable(String),

    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Supplies per-region radiance readings for a period
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_readings(&self, period: &str) -> Result<Vec<RegionReading>, MetricError>;
}

/// Reads the most recent persisted sample per region
pub struct StoreMetricSource {
    state: StateManager,
}

impl StoreMetricSource {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }
}

#[async_trait]
impl MetricSource for StoreMetricSource {
    async fn fetch_readings(&self, period: &str) -> Result<Vec<RegionReading>, MetricError> {
        debug!(%period, "fetch_readings: called");
        let samples = self.state.latest_readings().await?;
        let readings = samples
            .into_iter()
            .map(|s| RegionReading::new(s.code, s.radiance))
            .collect::<Vec<_>>();
        debug!(count = readings.len(), "fetch_readings: complete");
        Ok(readings)
    }
}
