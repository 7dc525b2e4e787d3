//! Loop state tracker
//!
//! Process-lifetime record of the four phase timestamps and the in-flight
//! cycle counter. The tracker is an injectable handle, not ambient global
//! state: clones share one mutex-guarded record, so concurrent cycles can
//! mutate it without lost updates.
//!
//! This is a recording surface, not a validator: callers supply timestamps
//! and out-of-order sets simply overwrite.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

/// Snapshot of the loop's phase timestamps and queue depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoopState {
    /// When the Sense phase last ran (Unix milliseconds)
    pub last_sense: Option<i64>,

    /// When the Reason phase last ran
    pub last_reason: Option<i64>,

    /// When the Act phase last ran
    pub last_act: Option<i64>,

    /// When the Learn phase last ran
    pub last_learn: Option<i64>,

    /// Cycles currently in flight; never negative
    pub queue_depth: u64,
}

/// Shared handle to the loop state
#[derive(Clone, Default)]
pub struct LoopTracker {
    inner: Arc<Mutex<LoopState>>,
}

impl LoopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopState> {
        // A poisoned lock only means another cycle panicked mid-update;
        // the record itself is still usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> LoopState {
        *self.lock()
    }

    /// Record the Sense phase timestamp
    pub fn set_sense(&self, ts_ms: i64) {
        self.lock().last_sense = Some(ts_ms);
    }

    /// Record the Reason phase timestamp
    pub fn set_reason(&self, ts_ms: i64) {
        self.lock().last_reason = Some(ts_ms);
    }

    /// Record the Act phase timestamp
    pub fn set_act(&self, ts_ms: i64) {
        self.lock().last_act = Some(ts_ms);
    }

    /// Record the Learn phase timestamp
    pub fn set_learn(&self, ts_ms: i64) {
        self.lock().last_learn = Some(ts_ms);
    }

    /// Increment the in-flight cycle counter
    pub fn inc_queue(&self) {
        self.lock().queue_depth += 1;
    }

    /// Decrement the in-flight cycle counter, flooring at zero.
    ///
    /// Saturating so a duplicate completion signal cannot drive the depth
    /// negative.
    pub fn dec_queue(&self) {
        let mut state = self.lock();
        state.queue_depth = state.queue_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let tracker = LoopTracker::new();
        let state = tracker.snapshot();
        assert_eq!(state.last_sense, None);
        assert_eq!(state.last_learn, None);
        assert_eq!(state.queue_depth, 0);
    }

    #[test]
    fn test_phase_timestamps_overwrite() {
        let tracker = LoopTracker::new();
        tracker.set_sense(1000);
        tracker.set_sense(2000);
        assert_eq!(tracker.snapshot().last_sense, Some(2000));

        // Out-of-order sets are accepted, not rejected
        tracker.set_sense(500);
        assert_eq!(tracker.snapshot().last_sense, Some(500));
    }

    #[test]
    fn test_queue_depth_balance() {
        let tracker = LoopTracker::new();
        tracker.inc_queue();
        tracker.inc_queue();
        assert_eq!(tracker.snapshot().queue_depth, 2);

        tracker.dec_queue();
        tracker.dec_queue();
        assert_eq!(tracker.snapshot().queue_depth, 0);
    }

    #[test]
    fn test_dec_queue_saturates_at_zero() {
        let tracker = LoopTracker::new();
        tracker.dec_queue();
        tracker.dec_queue();
        assert_eq!(tracker.snapshot().queue_depth, 0);
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = LoopTracker::new();
        let other = tracker.clone();

        other.inc_queue();
        other.set_act(42);

        assert_eq!(tracker.snapshot().queue_depth, 1);
        assert_eq!(tracker.snapshot().last_act, Some(42));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let tracker = LoopTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.inc_queue();
                        tracker.dec_queue();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.snapshot().queue_depth, 0);
    }
}
