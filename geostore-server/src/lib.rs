pub mod config;
pub mod core;
pub mod replication;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::{LoggingConfig, ServerConfig, StoresConfig};
pub use core::{NewRecord, Record, Region, RegionStore, Result, StoreError, StoreId, StoreSet};
pub use replication::{
    LatencyEstimator, LatencyMeasurement, Replicate, ReplicaStatusReport, ReplicationConfig,
    Replicator, StatusTracker, SyncStatus,
};
pub use server::{AppState, create_router};
pub use service::ContentService;
