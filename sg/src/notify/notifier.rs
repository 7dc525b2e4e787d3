//! Alert notifier
//!
//! Consumes unsent alerts and dispatches one notification per alert. An
//! alert is marked sent only on confirmed dispatch, via the conditional
//! update in the store; a dispatch failure leaves it unsent for the next
//! run. Failures are isolated per alert - one bad send never aborts the
//! batch.

use std::sync::Arc;

use glowstore::now_ms;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::Alert;
use crate::state::{MarkOutcome, StateManager};

use super::channel::NotificationChannel;

/// Counts from one notifier run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NotifyReport {
    /// Unsent alerts considered
    pub processed: usize,

    /// Dispatched and marked sent by this run
    pub sent: usize,

    /// Dispatch failures; alerts remain unsent
    pub failed: usize,

    /// Dispatched, but a racing run had already marked the alert
    pub conflicts: usize,
}

/// Dispatches notifications for unsent alerts
pub struct Notifier {
    state: StateManager,
    channel: Arc<dyn NotificationChannel>,
    destination: String,
}

impl Notifier {
    pub fn new(
        state: StateManager,
        channel: Arc<dyn NotificationChannel>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            state,
            channel,
            destination: destination.into(),
        }
    }

    /// Process every unsent alert once.
    ///
    /// Re-invoking with nothing unsent is a no-op returning zero counts.
    pub async fn run(&self) -> eyre::Result<NotifyReport> {
        debug!(channel = self.channel.name(), "run: called");
        let unsent = self.state.list_unsent().await?;
        let mut report = NotifyReport::default();

        for alert in &unsent {
            report.processed += 1;
            let subject = subject_for(alert);
            let body = body_for(alert);

            match self.channel.send(&self.destination, &subject, &body).await {
                Ok(()) => match self.state.mark_sent(&alert.id, now_ms()).await? {
                    MarkOutcome::Sent => {
                        debug!(alert_id = %alert.id, "run: alert dispatched and marked");
                        report.sent += 1;
                    }
                    MarkOutcome::AlreadySent => {
                        // Lost the race to a concurrent notifier run
                        debug!(alert_id = %alert.id, "run: alert already marked by another run");
                        report.conflicts += 1;
                    }
                },
                Err(e) => {
                    warn!(alert_id = %alert.id, error = %e, "Dispatch failed, alert stays unsent");
                    report.failed += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            "Notifier run complete"
        );
        Ok(report)
    }
}

fn subject_for(alert: &Alert) -> String {
    format!("Light Pollution Alert: {}", alert.code)
}

fn body_for(alert: &Alert) -> String {
    format!("Severity: {}\n\n{}", alert.severity, alert.message)
}
