use crate::core::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One unit of propagation work for a single replica. Transient: created by
/// the engine, discarded once applied or failed, never persisted.
#[derive(Debug, Clone)]
pub struct ReplicationTask {
    pub record: Record,
    pub replica: usize,
    pub scheduled_at: DateTime<Utc>,
    pub delay: Duration,
}

/// Per-replica convergence state as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No recent write/delete event; the replica is assumed converged.
    Ok,
    /// A write/delete event happened within the status window; propagation
    /// may still be in flight.
    Syncing,
    /// The most recent propagation attempt for this replica failed.
    Error,
}

/// Status report entry for one replica.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaStatusReport {
    pub replica: String,
    pub status: SyncStatus,
    pub last_event_time: Option<DateTime<Utc>>,
}

/// Synthesized latency comparison for one region. Pure presentation; not a
/// measurement of any real network path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMeasurement {
    pub region: crate::core::Region,
    pub replica_ms: u64,
    pub master_ms: u64,
    pub gain_ms: u64,
    pub summary: String,
}
