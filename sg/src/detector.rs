//! Hotspot detection
//!
//! Pure scoring over a batch of per-region radiance readings. The threshold
//! is the upper quartile of the batch (linear interpolation on sorted
//! values); every reading at or above it is flagged. Persistence of flagged
//! candidates is the cycle driver's job, not this module's.

use std::cmp::Ordering;

use crate::domain::{HotspotCandidate, RegionReading, Severity};

/// Quantile below which readings are considered unremarkable
const TOP_QUANTILE: f64 = 0.75;

/// Score a batch of readings, returning the flagged subset, biggest first.
///
/// With fewer than four readings the quartile degenerates to the maximum
/// value: only the maximum is flagged, ties at the maximum included.
pub fn detect(readings: &[RegionReading]) -> Vec<HotspotCandidate> {
    if readings.is_empty() {
        return Vec::new();
    }

    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let threshold = upper_quartile(&values);

    let mut flagged: Vec<HotspotCandidate> = readings
        .iter()
        .filter(|r| r.value >= threshold)
        .map(|r| candidate(r, threshold))
        .collect();

    // Biggest first, for stable presentation downstream
    flagged.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    flagged
}

fn candidate(reading: &RegionReading, threshold: f64) -> HotspotCandidate {
    let severity = if reading.value >= 2.0 * threshold {
        Severity::High
    } else {
        Severity::Medium
    };

    HotspotCandidate {
        code: reading.code.clone(),
        value: reading.value,
        threshold,
        severity,
        message: format!(
            "Region {} radiance {:.2} is at or above the upper-quartile threshold {:.2}.",
            reading.code, reading.value, threshold
        ),
    }
}

/// Upper-quartile threshold via linear interpolation on sorted values.
///
/// n < 4 degenerates to the maximum.
fn upper_quartile(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let pos = (sorted.len() - 1) as f64 * TOP_QUANTILE;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}
