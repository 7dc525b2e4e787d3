//! Ephemeral reading and candidate shapes
//!
//! A `RegionReading` is one measurement flowing from the metric source into
//! the detector; a `HotspotCandidate` is the detector's verdict before the
//! driver persists it as an `Alert`.

use serde::{Deserialize, Serialize};

use glowstore::{Alert, Severity};

/// One radiance measurement for one region in one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReading {
    /// Region code
    pub code: String,

    /// Measured radiance (nW/cm²/sr)
    pub value: f64,
}

impl RegionReading {
    pub fn new(code: impl Into<String>, value: f64) -> Self {
        Self {
            code: code.into(),
            value,
        }
    }
}

/// A reading the detector flagged as anomalous
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotCandidate {
    /// Region code of the originating reading
    pub code: String,

    /// The flagged radiance value
    pub value: f64,

    /// Threshold the value met or exceeded
    pub threshold: f64,

    /// Severity derived from how far above threshold the value lies
    pub severity: Severity,

    /// Human-readable summary
    pub message: String,
}

impl HotspotCandidate {
    /// Convert into a persistable alert record
    pub fn to_alert(&self) -> Alert {
        Alert::new(&self.code, self.severity, &self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_to_alert_carries_fields() {
        let candidate = HotspotCandidate {
            code: "North-x1".to_string(),
            value: 12.0,
            threshold: 9.0,
            severity: Severity::Medium,
            message: "above threshold".to_string(),
        };

        let alert = candidate.to_alert();
        assert_eq!(alert.code, "North-x1");
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.message, "above threshold");
        assert!(alert.sent_at.is_none());
    }
}
