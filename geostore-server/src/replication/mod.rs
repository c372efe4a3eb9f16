/// Replication module - master/replica fan-out with periodic repair
///
/// Design:
/// - 1 master store (accepts writes)
/// - N regional replica stores (read-only, eventually consistent)
/// - Per-write asynchronous fan-out with simulated propagation lag
/// - Periodic full sync as the only repair mechanism for missed tasks
///
/// Features:
/// - One worker queue per replica, failures isolated per replica
/// - Observable "propagation settled" signal for deterministic tests
/// - Time-window status reporting (ok / syncing / error)
/// - Synthesized per-region latency comparison
pub mod config;
pub mod engine;
pub mod latency;
pub mod status;
pub mod types;

pub use config::ReplicationConfig;
pub use engine::{Replicate, Replicator};
pub use latency::LatencyEstimator;
pub use status::StatusTracker;
pub use types::{LatencyMeasurement, ReplicaStatusReport, ReplicationTask, SyncStatus};

#[cfg(test)]
mod tests;
