//! CycleDriver - executes one monitoring cycle
//!
//! Phases run strictly in sequence: Sense (fetch readings), Reason (score
//! and persist alerts), Act (dispatch notifications), Learn (record the
//! outcome). A failed phase is captured in the report and the remaining
//! phases still run; there is no retry within a cycle. The queue depth
//! incremented at Sense is decremented in Learn on every exit path.
//!
//! Concurrent cycles are allowed - the tracker serializes its own updates
//! and the state actor serializes store access. Callers wanting
//! backpressure inspect the queue depth before triggering.

use std::sync::Arc;

use glowstore::now_ms;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::detector::detect;
use crate::domain::{CycleEvent, Phase, RegionReading};
use crate::estimator::{self, MitigationEstimate, MitigationRequest};
use crate::notify::Notifier;
use crate::source::MetricSource;
use crate::state::{LoopTracker, StateManager};

/// Counts and errors from one cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// Period label the cycle sensed
    pub period: String,

    /// Readings acquired in Sense
    pub readings: usize,

    /// Alerts persisted in Reason
    pub alerts_created: usize,

    /// Alerts dispatched in Act
    pub alerts_sent: usize,

    /// Dispatch failures in Act
    pub send_failures: usize,

    /// Mitigation estimate, when a request accompanied the cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<MitigationEstimate>,

    /// Phase errors captured along the way
    pub errors: Vec<String>,
}

impl CycleReport {
    fn new(period: &str) -> Self {
        Self {
            period: period.to_string(),
            ..Default::default()
        }
    }

    /// Whether every phase completed cleanly
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Orchestrates the four-phase monitoring cycle
pub struct CycleDriver {
    state: StateManager,
    tracker: LoopTracker,
    source: Arc<dyn MetricSource>,
    notifier: Notifier,
}

impl CycleDriver {
    pub fn new(
        state: StateManager,
        tracker: LoopTracker,
        source: Arc<dyn MetricSource>,
        notifier: Notifier,
    ) -> Self {
        Self {
            state,
            tracker,
            source,
            notifier,
        }
    }

    /// Run one Sense -> Reason -> Act -> Learn cycle.
    ///
    /// Always completes and reports; errors surface in the report rather
    /// than aborting the sequence.
    pub async fn run_cycle(&self, period: &str) -> CycleReport {
        self.run_cycle_with(period, None).await
    }

    /// Run one cycle with an accompanying mitigation request; the Act phase
    /// evaluates it alongside notification dispatch.
    pub async fn run_cycle_with(
        &self,
        period: &str,
        mitigation: Option<MitigationRequest>,
    ) -> CycleReport {
        debug!(%period, "run_cycle: called");
        info!(%period, "Cycle starting");

        self.tracker.inc_queue();
        let mut report = CycleReport::new(period);

        let readings = self.sense(period, &mut report).await;
        self.reason(&readings, &mut report).await;
        self.act(mitigation, &mut report).await;
        self.learn(&report).await;

        self.tracker.dec_queue();
        info!(
            readings = report.readings,
            created = report.alerts_created,
            sent = report.alerts_sent,
            errors = report.errors.len(),
            "Cycle complete"
        );
        report
    }

    /// Sense: acquire new readings from the metric source
    async fn sense(&self, period: &str, report: &mut CycleReport) -> Vec<RegionReading> {
        debug!(%period, "sense: called");
        let readings = match self.source.fetch_readings(period).await {
            Ok(readings) => readings,
            Err(e) => {
                // Transient fetch failure: the phase is a no-op for this
                // cycle, later phases still run
                warn!(error = %e, "Sense fetch failed, continuing with empty batch");
                self.record_phase_error(Phase::Sense, &e.to_string()).await;
                report.errors.push(format!("sense: {e}"));
                Vec::new()
            }
        };

        report.readings = readings.len();
        self.tracker.set_sense(now_ms());
        debug!(count = readings.len(), "sense: complete");
        readings
    }

    /// Reason: score readings and persist flagged candidates as alerts
    async fn reason(&self, readings: &[RegionReading], report: &mut CycleReport) {
        debug!(readings = readings.len(), "reason: called");
        let candidates = detect(readings);

        for candidate in &candidates {
            match self.state.create_alert(candidate.to_alert()).await {
                Ok(id) => {
                    debug!(alert_id = %id, code = %candidate.code, "reason: alert created");
                    report.alerts_created += 1;
                }
                Err(e) => {
                    warn!(code = %candidate.code, error = %e, "Failed to persist alert");
                    self.record_phase_error(Phase::Reason, &e.to_string()).await;
                    report.errors.push(format!("reason: {e}"));
                }
            }
        }

        self.tracker.set_reason(now_ms());
        debug!(created = report.alerts_created, "reason: complete");
    }

    /// Act: dispatch notifications for unsent alerts, and evaluate an
    /// accompanying mitigation request when one was supplied
    async fn act(&self, mitigation: Option<MitigationRequest>, report: &mut CycleReport) {
        debug!("act: called");
        match self.notifier.run().await {
            Ok(notify) => {
                report.alerts_sent = notify.sent;
                report.send_failures = notify.failed;
            }
            Err(e) => {
                warn!(error = %e, "Act phase failed");
                self.record_phase_error(Phase::Act, &e.to_string()).await;
                report.errors.push(format!("act: {e}"));
            }
        }

        if let Some(request) = mitigation {
            report.mitigation = Some(estimator::estimate(
                request.shielding_pct,
                request.retrofit_pct,
            ));
        }

        self.tracker.set_act(now_ms());
        debug!(sent = report.alerts_sent, "act: complete");
    }

    /// Learn: record the cycle outcome. Runs regardless of earlier failures.
    async fn learn(&self, report: &CycleReport) {
        debug!("learn: called");
        let summary = format!(
            "cycle {}: {} readings, {} alerts created, {} sent, {} send failures",
            report.period,
            report.readings,
            report.alerts_created,
            report.alerts_sent,
            report.send_failures
        );

        let event = if report.is_clean() {
            CycleEvent::success(Phase::Learn, summary)
        } else {
            CycleEvent::error(Phase::Learn, format!("{summary}; errors: {}", report.errors.join("; ")))
        };

        if let Err(e) = self.state.record_event(event).await {
            // Event loss never fails the cycle
            warn!(error = %e, "Failed to record cycle event");
        }

        self.tracker.set_learn(now_ms());
        debug!("learn: complete");
    }

    async fn record_phase_error(&self, phase: Phase, message: &str) {
        if let Err(e) = self
            .state
            .record_event(CycleEvent::error(phase, message))
            .await
        {
            warn!(error = %e, %phase, "Failed to record phase error event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Alert, PhaseStatus, Severity};
    use crate::notify::{ChannelError, NotificationChannel};
    use crate::source::MetricError;
    use async_trait::async_trait;
    use glowstore::Store;

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
            Err(MetricError::Unavailable("tile server down".to_string()))
        }
    }

    struct OkChannel;

    #[async_trait]
    impl NotificationChannel for OkChannel {
        async fn send(&self, _to: &str, _s: &str, _b: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "ok"
        }
    }

    fn driver_with(source: Arc<dyn MetricSource>) -> (CycleDriver, StateManager, LoopTracker) {
        let state = StateManager::spawn_with_store(Store::open_in_memory().unwrap());
        let tracker = LoopTracker::new();
        let notifier = Notifier::new(state.clone(), Arc::new(OkChannel), "dev@local.invalid");
        let driver = CycleDriver::new(state.clone(), tracker.clone(), source, notifier);
        (driver, state, tracker)
    }

    #[tokio::test]
    async fn test_full_cycle_creates_and_sends() {
        let source = Arc::new(FixedSource {
            readings: vec![
                RegionReading::new("A", 1.0),
                RegionReading::new("B", 5.0),
                RegionReading::new("C", 9.0),
                RegionReading::new("D", 10.0),
            ],
        });
        let (driver, state, tracker) = driver_with(source);

        let report = driver.run_cycle("2026-08-04").await;

        assert_eq!(report.readings, 4);
        assert!(report.alerts_created >= 1);
        assert_eq!(report.alerts_sent, report.alerts_created);
        assert!(report.is_clean());

        // Every phase timestamp was recorded and the queue is balanced
        let snapshot = tracker.snapshot();
        assert!(snapshot.last_sense.is_some());
        assert!(snapshot.last_reason.is_some());
        assert!(snapshot.last_act.is_some());
        assert!(snapshot.last_learn.is_some());
        assert_eq!(snapshot.queue_depth, 0);

        // Learn persisted the cycle summary
        let events = state.recent_events(10).await.unwrap();
        assert!(
            events
                .iter()
                .any(|e| e.phase == Phase::Learn && e.status == PhaseStatus::Success)
        );

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_sense_failure_still_runs_later_phases() {
        let (driver, state, tracker) = driver_with(Arc::new(FailingSource));

        // An unsent alert from an earlier cycle should still go out
        state
            .create_alert(Alert::with_id("al-old", "West-1", Severity::High, "old spike"))
            .await
            .unwrap();

        let report = driver.run_cycle("2026-08-04").await;

        assert_eq!(report.readings, 0);
        assert_eq!(report.alerts_created, 0);
        assert_eq!(report.alerts_sent, 1);
        assert!(!report.is_clean());

        let snapshot = tracker.snapshot();
        assert!(snapshot.last_learn.is_some());
        assert_eq!(snapshot.queue_depth, 0);

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_queue_balanced_across_cycles() {
        let (driver, state, tracker) = driver_with(Arc::new(FixedSource {
            readings: vec![RegionReading::new("A", 3.0)],
        }));

        for _ in 0..3 {
            let before = tracker.snapshot().queue_depth;
            driver.run_cycle("p").await;
            assert_eq!(tracker.snapshot().queue_depth, before);
        }

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mitigation_request_evaluated_in_act() {
        let (driver, state, _tracker) = driver_with(Arc::new(FixedSource {
            readings: Vec::new(),
        }));

        let request = MitigationRequest {
            shielding_pct: 100.0,
            retrofit_pct: 100.0,
        };
        let report = driver.run_cycle_with("p", Some(request)).await;

        let estimate = report.mitigation.unwrap();
        assert_eq!(estimate.drop_fraction, 0.70);
        assert_eq!(estimate.predicted_drop, 21.0);

        state.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_creates_nothing() {
        let (driver, state, _tracker) = driver_with(Arc::new(FixedSource {
            readings: Vec::new(),
        }));

        let report = driver.run_cycle("p").await;
        assert_eq!(report.alerts_created, 0);
        assert!(report.is_clean());

        state.shutdown().await.unwrap();
    }
}
