use super::types::{ReplicaStatusReport, SyncStatus};
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Tracks per-replica convergence state.
///
/// Policy: time-window heuristic. Any write/delete event stamps every
/// replica; a replica reports `Syncing` until the window elapses and `Ok`
/// afterwards, independent of replica content. A replica whose most recent
/// propagation attempt failed reports `Error` until a later attempt for it
/// succeeds. The window is configured to cover the propagation delay, so
/// `Syncing -> Ok` never happens while the triggering event's tasks are
/// still waiting out their lag, and `Ok -> Syncing` requires a new event.
///
/// The backing array is never exposed: callers get an owned snapshot, and
/// both mutations take the single lock only long enough to stamp a field.
pub struct StatusTracker {
    labels: Vec<String>,
    window: TimeDelta,
    states: Mutex<Vec<ReplicaState>>,
}

#[derive(Debug, Clone, Default)]
struct ReplicaState {
    last_event: Option<DateTime<Utc>>,
    last_attempt_failed: bool,
}

impl StatusTracker {
    pub fn new(labels: Vec<String>, window: Duration) -> Self {
        let states = vec![ReplicaState::default(); labels.len()];
        Self {
            labels,
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            states: Mutex::new(states),
        }
    }

    pub fn num_replicas(&self) -> usize {
        self.labels.len()
    }

    /// Record a write or delete on the master. Every replica enters the
    /// syncing window.
    pub fn record_event(&self) {
        let now = Utc::now();
        let mut states = self.states.lock();
        for state in states.iter_mut() {
            state.last_event = Some(now);
        }
    }

    /// Record the outcome of a propagation attempt against one replica.
    pub fn record_outcome(&self, replica: usize, ok: bool) {
        let mut states = self.states.lock();
        if let Some(state) = states.get_mut(replica) {
            state.last_attempt_failed = !ok;
        }
    }

    /// Atomic snapshot of every replica's reported state.
    pub fn snapshot(&self) -> Vec<ReplicaStatusReport> {
        let states = self.states.lock().clone();
        let now = Utc::now();

        states
            .iter()
            .enumerate()
            .map(|(index, state)| {
                let status = if state.last_attempt_failed {
                    SyncStatus::Error
                } else if state
                    .last_event
                    .is_some_and(|at| now.signed_duration_since(at) < self.window)
                {
                    SyncStatus::Syncing
                } else {
                    SyncStatus::Ok
                };

                ReplicaStatusReport {
                    replica: self.labels[index].clone(),
                    status,
                    last_event_time: state.last_event,
                }
            })
            .collect()
    }
}
