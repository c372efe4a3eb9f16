use crate::core::{NewRecord, Record, Region, Result, StoreSet};
use crate::replication::{
    LatencyEstimator, LatencyMeasurement, Replicate, ReplicaStatusReport, StatusTracker,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Write/read/delete orchestration over the master, the replica set and the
/// replication engine.
///
/// Writes are synchronous up to the master commit and then fan out without
/// the caller waiting; reads go straight to the region's store and may be
/// stale. Failures on the master path are fatal to the request, failures on
/// any replica path never are.
pub struct ContentService<R: Replicate> {
    stores: Arc<StoreSet>,
    replicator: Arc<R>,
    status: Arc<StatusTracker>,
    latency: LatencyEstimator,
}

impl<R: Replicate> ContentService<R> {
    pub fn new(
        stores: Arc<StoreSet>,
        replicator: Arc<R>,
        status: Arc<StatusTracker>,
        latency: LatencyEstimator,
    ) -> Self {
        Self {
            stores,
            replicator,
            status,
            latency,
        }
    }

    pub fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub fn replicator(&self) -> &Arc<R> {
        &self.replicator
    }

    /// Commit a new record on the master and queue propagation. The record
    /// is returned as soon as the master write lands; no replica has seen
    /// it yet at that point.
    pub async fn create(&self, new: NewRecord) -> Result<Record> {
        new.validate()?;

        // All writes originate on the master, which lives in EU.
        let record = self
            .stores
            .master()
            .insert_returning(new, Region::Eu)
            .await?;

        info!(id = record.id, "record committed on master");
        self.replicator.schedule(record.clone());
        self.status.record_event();

        Ok(record)
    }

    /// Region-routed read. Replica staleness is expected and never an error.
    pub async fn list_by_region(&self, region: Region) -> Result<Vec<Record>> {
        self.stores.pool_for_region(region).select_all().await
    }

    /// Delete from the master, then best-effort from every replica. A
    /// replica that misses its delete keeps the row until it is next
    /// overwritten; full sync does not purge it.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.stores.master().delete(id).await?;

        for (index, replica) in self.stores.replicas().iter().enumerate() {
            if let Err(err) = replica.delete(id).await {
                warn!(replica = index, id, error = %err, "replica delete failed; row may linger");
            }
        }

        self.status.record_event();
        Ok(())
    }

    /// Per-replica convergence snapshot.
    pub fn replication_status(&self) -> Vec<ReplicaStatusReport> {
        self.status.snapshot()
    }

    /// Synthesized latency comparison for a region.
    pub fn measure_latency(&self, region: Region) -> LatencyMeasurement {
        self.latency.measure(region)
    }
}
