//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Alert, AlertCounts, CycleEvent, MetricSample};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Result of a conditional mark-sent update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This caller won the transition
    Sent,
    /// Another caller already marked the alert (or the ID is unknown);
    /// expected under concurrent notifier runs, not an error
    AlreadySent,
}

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Alert operations
    CreateAlert {
        alert: Alert,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetAlert {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Alert>>>,
    },
    ListAlerts {
        reply: oneshot::Sender<StateResponse<Vec<Alert>>>,
    },
    ListUnsent {
        reply: oneshot::Sender<StateResponse<Vec<Alert>>>,
    },
    MarkSent {
        id: String,
        ts_ms: i64,
        reply: oneshot::Sender<StateResponse<MarkOutcome>>,
    },
    AlertCounts {
        reply: oneshot::Sender<StateResponse<AlertCounts>>,
    },

    // Metric operations
    InsertMetrics {
        samples: Vec<MetricSample>,
        reply: oneshot::Sender<StateResponse<usize>>,
    },
    LatestReadings {
        reply: oneshot::Sender<StateResponse<Vec<MetricSample>>>,
    },

    // Cycle event operations
    RecordEvent {
        event: CycleEvent,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    RecentEvents {
        limit: usize,
        reply: oneshot::Sender<StateResponse<Vec<CycleEvent>>>,
    },

    // Shutdown
    Shutdown,
}
