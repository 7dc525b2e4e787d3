//! Integration tests for the skyglow monitoring loop
//!
//! These tests verify end-to-end behavior of a cycle over a real store:
//! alert creation from sensed readings, exactly-once dispatch, and queue
//! balance on failure paths.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use skyglow::domain::{Alert, MetricSample, RegionReading, Severity};
use skyglow::notify::{ChannelError, NotificationChannel, Notifier};
use skyglow::r#loop::CycleDriver;
use skyglow::source::{MetricError, MetricSource, StoreMetricSource};
use skyglow::state::{LoopTracker, StateManager};

// =============================================================================
// Test doubles
// =============================================================================

struct FixedSource {
    readings: Vec<RegionReading>,
}

#[async_trait]
impl MetricSource for FixedSource {
    async fn fetch_readings(&self, _period: &str) -> Result<Vec<RegionReading>, MetricError> {
        Ok(self.readings.clone())
    }
}

struct FailingSource;

#[async_trait]
impl MetricSource for FailingSource {
    async fn fetch_readings(&self, _period: &str) -> Result<Vec<RegionReading>, MetricError> {
        Err(MetricError::Unavailable("simulated outage".to_string()))
    }
}

#[derive(Default)]
struct CountingChannel {
    calls: Mutex<Vec<String>>,
    fail_all: bool,
}

impl CountingChannel {
    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_all: true,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for CountingChannel {
    async fn send(&self, _to: &str, subject: &str, _body: &str) -> Result<(), ChannelError> {
        self.calls.lock().unwrap().push(subject.to_string());
        if self.fail_all {
            return Err(ChannelError::Http("simulated outage".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

fn driver(
    state: &StateManager,
    tracker: &LoopTracker,
    source: Arc<dyn MetricSource>,
    channel: Arc<dyn NotificationChannel>,
) -> CycleDriver {
    let notifier = Notifier::new(state.clone(), channel, "dev@local.invalid");
    CycleDriver::new(state.clone(), tracker.clone(), source, notifier)
}

// =============================================================================
// Cycle behavior
// =============================================================================

#[tokio::test]
async fn test_cycle_senses_reasons_and_dispatches() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();
    let tracker = LoopTracker::new();

    let source = Arc::new(FixedSource {
        readings: vec![
            RegionReading::new("North-a1", 1.0),
            RegionReading::new("South-b2", 5.0),
            RegionReading::new("East-c3", 9.0),
            RegionReading::new("West-d4", 10.0),
        ],
    });
    let channel = Arc::new(CountingChannel::default());
    let driver = driver(&state, &tracker, source, channel.clone());

    let report = driver.run_cycle("2026-08-04").await;

    assert_eq!(report.readings, 4);
    assert!(report.alerts_created >= 1);
    assert_eq!(report.alerts_sent, report.alerts_created);
    assert_eq!(channel.call_count(), report.alerts_created);
    assert!(report.is_clean());

    // Alerts in the store are all marked sent
    let alerts = state.list_alerts().await.unwrap();
    assert_eq!(alerts.len(), report.alerts_created);
    assert!(alerts.iter().all(|a| a.is_sent()));

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_two_notifier_runs_dispatch_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();

    state
        .create_alert(Alert::with_id("al-1", "North-a1", Severity::High, "spike"))
        .await
        .unwrap();

    let channel = Arc::new(CountingChannel::default());
    let notifier = Notifier::new(state.clone(), channel.clone(), "dev@local.invalid");

    let first = notifier.run().await.unwrap();
    assert_eq!(first.processed, 1);
    assert_eq!(first.sent, 1);

    let alert = state.get_alert("al-1").await.unwrap().unwrap();
    assert!(alert.sent_at.is_some());

    let second = notifier.run().await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.sent, 0);

    // Exactly one dispatch across both runs
    assert_eq!(channel.call_count(), 1);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queue_balanced_when_sense_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();
    let tracker = LoopTracker::new();

    let driver = driver(
        &state,
        &tracker,
        Arc::new(FailingSource),
        Arc::new(CountingChannel::default()),
    );

    let before = tracker.snapshot().queue_depth;
    let report = driver.run_cycle("2026-08-04").await;
    let after = tracker.snapshot();

    assert_eq!(after.queue_depth, before);
    assert!(!report.is_clean());
    // Learn still ran
    assert!(after.last_learn.is_some());

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queue_balanced_when_dispatch_fails() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();
    let tracker = LoopTracker::new();

    let source = Arc::new(FixedSource {
        readings: vec![
            RegionReading::new("A", 1.0),
            RegionReading::new("B", 2.0),
            RegionReading::new("C", 3.0),
            RegionReading::new("D", 20.0),
        ],
    });
    let driver = driver(
        &state,
        &tracker,
        source,
        Arc::new(CountingChannel::failing()),
    );

    let report = driver.run_cycle("2026-08-04").await;

    assert_eq!(tracker.snapshot().queue_depth, 0);
    assert!(report.alerts_created >= 1);
    assert_eq!(report.alerts_sent, 0);
    assert_eq!(report.send_failures, report.alerts_created);

    // Failed alerts stay queued for the next cycle
    let unsent = state.list_unsent().await.unwrap();
    assert_eq!(unsent.len(), report.alerts_created);

    state.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_cycles_balance_queue() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();
    let tracker = LoopTracker::new();

    let source = Arc::new(FixedSource {
        readings: vec![RegionReading::new("A", 3.0)],
    });
    let driver = Arc::new(driver(
        &state,
        &tracker,
        source,
        Arc::new(CountingChannel::default()),
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let driver = driver.clone();
            tokio::spawn(async move { driver.run_cycle(&format!("p-{i}")).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(tracker.snapshot().queue_depth, 0);

    state.shutdown().await.unwrap();
}

// =============================================================================
// Store-backed source
// =============================================================================

#[tokio::test]
async fn test_cycle_over_persisted_metrics() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let state = StateManager::spawn(temp.path()).unwrap();
    let tracker = LoopTracker::new();

    state
        .insert_metrics(vec![
            MetricSample::new("North-a1", 100, 12.0),
            MetricSample::new("South-b2", 100, 14.0),
            MetricSample::new("East-c3", 100, 11.0),
            MetricSample::new("West-d4", 100, 55.0),
        ])
        .await
        .unwrap();

    let source = Arc::new(StoreMetricSource::new(state.clone()));
    let channel = Arc::new(CountingChannel::default());
    let driver = driver(&state, &tracker, source, channel);

    let report = driver.run_cycle("2026-08-04").await;

    assert_eq!(report.readings, 4);
    assert!(report.alerts_created >= 1);

    // The clear outlier was among the flagged regions
    let alerts = state.list_alerts().await.unwrap();
    assert!(alerts.iter().any(|a| a.code == "West-d4"));

    state.shutdown().await.unwrap();
}
