//! Deterministic synthetic dataset generation
//!
//! Builds a reproducible catalog of sources, region entities, radiance
//! metrics, alerts, and cycle events for tests and demo bootstrapping. The
//! generator is a pure function of its seed: an explicit `StdRng` is
//! threaded through every draw and all timestamps derive from a fixed
//! reference epoch, so two builds with the same seed compare equal.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::domain::{Alert, CycleEvent, MetricSample, Phase, PhaseStatus, Severity};
use crate::state::StateManager;

const SOURCES: [(&str, &str); 5] = [
    ("VIIRS DNB Nightly", "satellite"),
    ("VIIRS Monthly Composite", "satellite"),
    ("SQM Ground Network", "ground"),
    ("Citizen Sky Reports", "crowd"),
    ("Aerial Survey", "survey"),
];

const REGIONS: [&str; 12] = [
    "North",
    "South",
    "East",
    "West",
    "Central",
    "Northeast",
    "Northwest",
    "Southeast",
    "Southwest",
    "Mountain",
    "Coastal",
    "Valley",
];

const ENTITIES_PER_REGION: usize = 50;
const METRIC_DAYS: usize = 30;
const ALERT_COUNT: usize = 30;
const EVENT_COUNT: usize = 100;

const ALERT_TITLES: [&str; 5] = [
    "Anomaly Detected",
    "Threshold Exceeded",
    "Pattern Change",
    "Unusual Activity",
    "Critical Update",
];

/// Fixed reference epoch (2025-06-15T00:00:00Z-ish, Unix ms) so generated
/// timestamps are a function of the seed, not the wall clock
const REFERENCE_EPOCH_MS: i64 = 1_750_000_000_000;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// A data source in the synthetic catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedSource {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub coverage_pct: f64,
    pub last_updated_at: i64,
}

/// A monitored region entity in the synthetic catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedEntity {
    pub id: String,
    pub code: String,
    pub name: String,
    pub region: String,
    pub source_id: String,
}

/// The full synthetic dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedDataset {
    pub sources: Vec<SeedSource>,
    pub entities: Vec<SeedEntity>,
    pub metrics: Vec<MetricSample>,
    pub alerts: Vec<Alert>,
    pub events: Vec<CycleEvent>,
}

/// Build the synthetic dataset for a seed value.
///
/// Cardinalities are fixed: 5 sources, 12 x 50 entities, 30 metrics per
/// entity, 30 alerts, 100 events.
pub fn build_seed_data(seed: u64) -> SeedDataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let sources: Vec<SeedSource> = SOURCES
        .iter()
        .enumerate()
        .map(|(i, (name, kind))| SeedSource {
            id: format!("src-{i}"),
            name: name.to_string(),
            kind: kind.to_string(),
            coverage_pct: round1(rng.random_range(63.0..92.0)),
            last_updated_at: REFERENCE_EPOCH_MS - rng.random_range(1..48) * HOUR_MS,
        })
        .collect();

    let mut entities = Vec::with_capacity(REGIONS.len() * ENTITIES_PER_REGION);
    let mut taken_codes = std::collections::HashSet::new();
    let mut eid = 0usize;
    for region in REGIONS {
        for _ in 0..ENTITIES_PER_REGION {
            let source = &sources[rng.random_range(0..sources.len())];
            // Codes key the metrics table; redraw on the rare collision
            let code = loop {
                let candidate =
                    format!("{}-{}", region, base36(rng.random_range(100_000..1_000_000)));
                if taken_codes.insert(candidate.clone()) {
                    break candidate;
                }
            };
            entities.push(SeedEntity {
                id: format!("ent-{eid}"),
                code,
                name: format!("{} {}", region, rng.random_range(1..999)),
                region: region.to_string(),
                source_id: source.id.clone(),
            });
            eid += 1;
        }
    }

    let start = REFERENCE_EPOCH_MS - METRIC_DAYS as i64 * DAY_MS;
    let mut metrics = Vec::with_capacity(entities.len() * METRIC_DAYS);
    for entity in &entities {
        let mut value: f64 = rng.random_range(10.0..100.0);
        for day in 0..METRIC_DAYS {
            value += rng.random_range(-0.5..0.5);
            // Occasional spikes to keep the detector honest
            if rng.random::<f64>() > 0.96 {
                value += rng.random_range(1.0..3.0);
            }
            value = value.max(0.0);
            metrics.push(MetricSample::new(
                &entity.code,
                start + day as i64 * DAY_MS,
                round2(value),
            ));
        }
    }

    let severities = [Severity::Low, Severity::Medium, Severity::High];
    let alerts: Vec<Alert> = (0..ALERT_COUNT)
        .map(|i| {
            let entity = &entities[rng.random_range(0..entities.len())];
            let severity = severities[rng.random_range(0..severities.len())];
            let title = ALERT_TITLES[rng.random_range(0..ALERT_TITLES.len())];
            let created_at = REFERENCE_EPOCH_MS - rng.random_range(0..7 * 24) * HOUR_MS;
            Alert::with_id(
                format!("al-{i}"),
                &entity.code,
                severity,
                format!("{} on {} in {}", title, entity.name, entity.region),
            )
            .with_created_at(created_at)
        })
        .collect();

    let phases = [Phase::Sense, Phase::Reason, Phase::Act, Phase::Learn];
    let events: Vec<CycleEvent> = (0..EVENT_COUNT)
        .map(|i| {
            let phase = phases[rng.random_range(0..phases.len())];
            let message = phase_message(&mut rng, phase);
            let status = if rng.random_range(0..5) == 0 {
                PhaseStatus::Error
            } else {
                PhaseStatus::Success
            };
            CycleEvent {
                id: format!("ev-{i}"),
                phase,
                status,
                message: message.to_string(),
                at: REFERENCE_EPOCH_MS - rng.random_range(0..72) * HOUR_MS,
            }
        })
        .collect();

    SeedDataset {
        sources,
        entities,
        metrics,
        alerts,
        events,
    }
}

/// Persist the dataset's metrics, alerts, and events into the store.
///
/// Sources and entities are the generator's catalog; only the record
/// families the store holds are written. Returns (metrics, alerts, events)
/// counts.
pub async fn apply(dataset: &SeedDataset, state: &StateManager) -> eyre::Result<(usize, usize, usize)> {
    let metric_count = state.insert_metrics(dataset.metrics.clone()).await?;

    for alert in &dataset.alerts {
        state.create_alert(alert.clone()).await?;
    }

    for event in &dataset.events {
        state.record_event(event.clone()).await?;
    }

    Ok((metric_count, dataset.alerts.len(), dataset.events.len()))
}

fn phase_message(rng: &mut StdRng, phase: Phase) -> &'static str {
    let options: [&'static str; 3] = match phase {
        Phase::Sense => [
            "New data ingested from source",
            "Scheduled data collection complete",
            "Real-time stream processed",
        ],
        Phase::Reason => [
            "Anomaly detection completed",
            "Pattern analysis finished",
            "Risk assessment updated",
        ],
        Phase::Act => [
            "Notification sent to stakeholders",
            "Automated response triggered",
            "Alert dispatched to team",
        ],
        Phase::Learn => [
            "Model retrained with new data",
            "Feedback incorporated",
            "System parameters updated",
        ],
    };
    options[rng.random_range(0..options.len())]
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
