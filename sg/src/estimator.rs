//! Mitigation impact estimation
//!
//! Maps proposed shielding/retrofit levels to a predicted radiance drop.
//! Each 10 percentage points of shielding contributes a 4% reduction, each
//! 10 points of retrofit 3%; the summed fraction is capped at 70% and
//! applied to a fixed baseline radiance.
//!
//! The arithmetic is deliberately literal: out-of-range inputs are not
//! clamped or rejected here (range validation belongs to the caller via
//! [`MitigationRequest::validate`]), and the function never errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typical observed radiance used as the reference baseline (nW/cm²/sr)
pub const BASELINE_RADIANCE: f64 = 30.0;

/// Engineering ceiling on the achievable reduction fraction
pub const MAX_DROP_FRACTION: f64 = 0.70;

/// Reduction per 10 percentage points of shielding
const SHIELDING_FACTOR: f64 = 0.04;

/// Reduction per 10 percentage points of retrofit
const RETROFIT_FACTOR: f64 = 0.03;

/// A malformed mitigation request
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
}

/// Proposed intervention levels, both in percent
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MitigationRequest {
    pub shielding_pct: f64,
    pub retrofit_pct: f64,
}

impl MitigationRequest {
    /// Reject requests the estimator's arithmetic cannot meaningfully serve
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.shielding_pct.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "shielding_pct",
            });
        }
        if !self.retrofit_pct.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "retrofit_pct",
            });
        }
        Ok(())
    }
}

/// Predicted effect of a mitigation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MitigationEstimate {
    /// Cap-applied reduction fraction (0.70 max)
    pub drop_fraction: f64,

    /// Predicted absolute radiance drop (nW/cm²/sr)
    pub predicted_drop: f64,
}

/// Estimate the radiance drop for the given intervention levels
pub fn estimate(shielding_pct: f64, retrofit_pct: f64) -> MitigationEstimate {
    let drop_fraction = f64::min(
        MAX_DROP_FRACTION,
        (shielding_pct / 10.0) * SHIELDING_FACTOR + (retrofit_pct / 10.0) * RETROFIT_FACTOR,
    );

    MitigationEstimate {
        drop_fraction,
        predicted_drop: BASELINE_RADIANCE * drop_fraction,
    }
}
