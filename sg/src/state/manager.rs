//! StateManager - actor that owns the glowstore Store
//!
//! Processes commands via channels for thread-safe access to persistent
//! state. All store access is serialized through the actor, so the
//! conditional mark-sent update behaves as a per-alert critical section
//! even under concurrent notifier runs.

use std::path::Path;

use glowstore::Store;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::domain::{Alert, AlertCounts, CycleEvent, MetricSample};

use super::messages::{MarkOutcome, StateCommand, StateError, StateResponse};

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over a store directory
    pub fn spawn(store_dir: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_dir = %store_dir.as_ref().display(), "spawn: called");
        let store = Store::open(store_dir.as_ref())?;
        Ok(Self::spawn_with_store(store))
    }

    /// Spawn over an already-open store (tests use the in-memory variant)
    pub fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    // === Alert operations ===

    /// Persist a new alert
    pub async fn create_alert(&self, alert: Alert) -> StateResponse<String> {
        debug!(alert_id = %alert.id, code = %alert.code, "create_alert: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::CreateAlert {
                alert,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Get an alert by ID
    pub async fn get_alert(&self, id: &str) -> StateResponse<Option<Alert>> {
        debug!(%id, "get_alert: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::GetAlert {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// All alerts, newest first
    pub async fn list_alerts(&self) -> StateResponse<Vec<Alert>> {
        debug!("list_alerts: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::ListAlerts { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Alerts awaiting dispatch, oldest first
    pub async fn list_unsent(&self) -> StateResponse<Vec<Alert>> {
        debug!("list_unsent: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::ListUnsent { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Mark an alert sent if (and only if) it is still unsent
    pub async fn mark_sent(&self, id: &str, ts_ms: i64) -> StateResponse<MarkOutcome> {
        debug!(%id, ts_ms, "mark_sent: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::MarkSent {
                id: id.to_string(),
                ts_ms,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Alert totals for the status surface
    pub async fn alert_counts(&self) -> StateResponse<AlertCounts> {
        debug!("alert_counts: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::AlertCounts { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Metric operations ===

    /// Insert a batch of radiance samples
    pub async fn insert_metrics(&self, samples: Vec<MetricSample>) -> StateResponse<usize> {
        debug!(count = samples.len(), "insert_metrics: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::InsertMetrics {
                samples,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Latest radiance sample per region
    pub async fn latest_readings(&self) -> StateResponse<Vec<MetricSample>> {
        debug!("latest_readings: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::LatestReadings { reply: reply_tx })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Cycle event operations ===

    /// Persist one phase outcome
    pub async fn record_event(&self, event: CycleEvent) -> StateResponse<String> {
        debug!(phase = %event.phase, status = %event.status, "record_event: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::RecordEvent {
                event,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Most recent events, newest first
    pub async fn recent_events(&self, limit: usize) -> StateResponse<Vec<CycleEvent>> {
        debug!(limit, "recent_events: called");
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        self.tx
            .send(StateCommand::RecentEvents {
                limit,
                reply: reply_tx,
            })
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

/// The actor loop that owns the Store and processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::CreateAlert { alert, reply } => {
                debug!(alert_id = %alert.id, "actor_loop: CreateAlert command");
                let result = store
                    .create_alert(alert)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::GetAlert { id, reply } => {
                debug!(%id, "actor_loop: GetAlert command");
                let result = store
                    .get_alert(&id)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::ListAlerts { reply } => {
                debug!("actor_loop: ListAlerts command");
                let result = store
                    .list_alerts()
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::ListUnsent { reply } => {
                debug!("actor_loop: ListUnsent command");
                let result = store
                    .list_unsent()
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::MarkSent { id, ts_ms, reply } => {
                debug!(%id, "actor_loop: MarkSent command");
                let result = store
                    .mark_sent_if_unsent(&id, ts_ms)
                    .map(|updated| {
                        if updated == 1 {
                            MarkOutcome::Sent
                        } else {
                            MarkOutcome::AlreadySent
                        }
                    })
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::AlertCounts { reply } => {
                debug!("actor_loop: AlertCounts command");
                let result = store
                    .alert_counts()
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::InsertMetrics { samples, reply } => {
                debug!(count = samples.len(), "actor_loop: InsertMetrics command");
                let result = store
                    .insert_metrics(&samples)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::LatestReadings { reply } => {
                debug!("actor_loop: LatestReadings command");
                let result = store
                    .latest_readings()
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::RecordEvent { event, reply } => {
                debug!(event_id = %event.id, "actor_loop: RecordEvent command");
                let result = store
                    .record_event(event)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::RecentEvents { limit, reply } => {
                debug!(limit, "actor_loop: RecentEvents command");
                let result = store
                    .recent_events(limit)
                    .map_err(|e| StateError::StoreError(e.to_string()));
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Phase, Severity};
    use tempfile::tempdir;

    fn manager() -> StateManager {
        StateManager::spawn_with_store(Store::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_state_manager_alert_crud() {
        let manager = manager();

        let alert = Alert::with_id("al-1", "North-x1", Severity::High, "spike");
        let id = manager.create_alert(alert).await.unwrap();
        assert_eq!(id, "al-1");

        let retrieved = manager.get_alert("al-1").await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().code, "North-x1");

        let alerts = manager.list_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_manager_get_nonexistent() {
        let manager = manager();

        let result = manager.get_alert("nonexistent").await.unwrap();
        assert!(result.is_none());

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_state_manager_spawn_creates_store_dir() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("store");
        let manager = StateManager::spawn(&dir).unwrap();
        assert!(dir.exists());
        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_sent_outcomes() {
        let manager = manager();
        manager
            .create_alert(Alert::with_id("al-1", "A", Severity::Low, "m"))
            .await
            .unwrap();

        let first = manager.mark_sent("al-1", 1000).await.unwrap();
        assert_eq!(first, MarkOutcome::Sent);

        // A racing second transition loses without erroring
        let second = manager.mark_sent("al-1", 2000).await.unwrap();
        assert_eq!(second, MarkOutcome::AlreadySent);

        let alert = manager.get_alert("al-1").await.unwrap().unwrap();
        assert_eq!(alert.sent_at, Some(1000));

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_unsent_shrinks_after_mark() {
        let manager = manager();
        manager
            .create_alert(Alert::with_id("al-1", "A", Severity::Low, "m"))
            .await
            .unwrap();
        manager
            .create_alert(Alert::with_id("al-2", "B", Severity::Low, "m"))
            .await
            .unwrap();

        assert_eq!(manager.list_unsent().await.unwrap().len(), 2);

        manager.mark_sent("al-1", 1).await.unwrap();
        let unsent = manager.list_unsent().await.unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].id, "al-2");

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_metrics_roundtrip() {
        let manager = manager();
        manager
            .insert_metrics(vec![
                MetricSample::new("North", 100, 10.0),
                MetricSample::new("North", 200, 11.0),
                MetricSample::new("South", 100, 7.5),
            ])
            .await
            .unwrap();

        let readings = manager.latest_readings().await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].radiance, 11.0);

        manager.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_roundtrip() {
        let manager = manager();
        manager
            .record_event(CycleEvent::success(Phase::Learn, "cycle complete"))
            .await
            .unwrap();

        let events = manager.recent_events(10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, Phase::Learn);

        manager.shutdown().await.unwrap();
    }
}
