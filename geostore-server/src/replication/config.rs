use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Replication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Simulated propagation lag applied before a task touches its replica.
    pub propagation_delay_ms: u64,

    /// Period of the full master-to-replica reconciliation pass.
    pub full_sync_interval_secs: u64,

    /// How long replicas report "syncing" after a write/delete event. Must
    /// cover the propagation delay, or status would flip to "ok" while
    /// tasks are still in flight.
    pub status_window_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            propagation_delay_ms: 2000,    // 2 second simulated lag
            full_sync_interval_secs: 10,   // drift repair every 10 seconds
            status_window_ms: 3000,        // 3 second syncing window
        }
    }
}

impl ReplicationConfig {
    pub fn propagation_delay(&self) -> Duration {
        Duration::from_millis(self.propagation_delay_ms)
    }

    pub fn full_sync_interval(&self) -> Duration {
        Duration::from_secs(self.full_sync_interval_secs)
    }

    pub fn status_window(&self) -> Duration {
        Duration::from_millis(self.status_window_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.full_sync_interval_secs == 0 {
            return Err("replication.full_sync_interval_secs must be greater than zero".to_string());
        }
        if self.status_window_ms < self.propagation_delay_ms {
            return Err(
                "replication.status_window_ms must be at least propagation_delay_ms".to_string(),
            );
        }
        Ok(())
    }
}
