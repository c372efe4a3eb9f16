use super::config::ReplicationConfig;
use super::status::StatusTracker;
use super::types::ReplicationTask;
use crate::core::{Record, RegionStore, Result, StoreError, StoreSet};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Notify, mpsc};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Capability needed by the write path: queue incremental propagation and
/// run a full reconciliation pass. The service layer depends on this
/// interface only, so it can be tested against a recording double.
pub trait Replicate: Send + Sync + 'static {
    /// Queue asynchronous propagation of a freshly committed record to
    /// every replica. Returns immediately; the caller never waits.
    fn schedule(&self, record: Record);

    /// Push the master's full listing to every replica.
    fn full_sync(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Pushes master mutations to the replica stores.
///
/// Incremental path: `schedule` fans a task out to one dedicated worker per
/// replica. Each worker waits out the simulated propagation delay, ensures
/// the replica's schema, then upserts with overwrite semantics. Outcomes
/// are independent per replica; a failure is logged and left for the next
/// full sync, it never rolls back the master write or blocks a sibling.
///
/// Repair path: `full_sync` re-asserts every record still present on the
/// master. It runs at startup and then on a fixed interval, and may overlap
/// in-flight incremental tasks freely since both sides only issue
/// idempotent overwrites. Replica staleness is therefore bounded by
/// max(propagation delay, full sync interval).
pub struct Replicator {
    config: ReplicationConfig,
    stores: Arc<StoreSet>,
    status: Arc<StatusTracker>,
    queues: Vec<mpsc::UnboundedSender<ReplicationTask>>,
    inflight: Arc<Inflight>,
}

/// Count of queued-but-unfinished tasks, with a signal on drain so tests
/// can await "propagation settled" instead of sleeping.
struct Inflight {
    count: AtomicUsize,
    drained: Notify,
}

impl Inflight {
    fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn complete(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

impl Replicator {
    /// Spawn one propagation worker per replica and return the engine.
    /// Must be called from within a Tokio runtime.
    pub fn new(
        stores: Arc<StoreSet>,
        config: ReplicationConfig,
        status: Arc<StatusTracker>,
    ) -> Self {
        let inflight = Arc::new(Inflight::new());
        let mut queues = Vec::with_capacity(stores.num_replicas());

        for (index, replica) in stores.replicas().iter().enumerate() {
            let (tx, rx) = mpsc::unbounded_channel();
            queues.push(tx);
            tokio::spawn(Self::replica_worker(
                index,
                replica.clone(),
                Arc::clone(&status),
                Arc::clone(&inflight),
                rx,
            ));
        }

        info!(replicas = queues.len(), "replication engine started");

        Self {
            config,
            stores,
            status,
            queues,
            inflight,
        }
    }

    /// Queue one propagation task per replica for a committed record.
    pub fn schedule(&self, record: Record) {
        if self.queues.is_empty() {
            debug!(id = record.id, "no replicas configured; nothing to propagate");
            return;
        }

        let scheduled_at = Utc::now();
        let delay = self.config.propagation_delay();

        for (index, queue) in self.queues.iter().enumerate() {
            let task = ReplicationTask {
                record: record.clone(),
                replica: index,
                scheduled_at,
                delay,
            };
            self.inflight.begin();
            if queue.send(task).is_err() {
                self.inflight.complete();
                warn!(replica = index, id = record.id, "replica worker gone; task dropped");
            }
        }

        debug!(
            id = record.id,
            replicas = self.queues.len(),
            delay_ms = self.config.propagation_delay_ms,
            "propagation scheduled"
        );
    }

    /// Resolve once every task queued so far has reached a terminal state
    /// (applied or failed).
    pub async fn settled(&self) {
        loop {
            let notified = self.inflight.drained.notified();
            tokio::pin!(notified);
            // Register interest before reading the counter, or a drain
            // between the read and the await could be missed.
            notified.as_mut().enable();
            if self.inflight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Full master-to-replica reconciliation pass.
    ///
    /// Re-asserts rows still present on the master only; rows a replica
    /// holds for ids already deleted on the master are left in place.
    /// Failing to read the master aborts the pass; a failing replica is
    /// logged and skipped.
    pub async fn full_sync(&self) -> Result<()> {
        let records = self.stores.master().select_all().await?;

        for (index, replica) in self.stores.replicas().iter().enumerate() {
            match Self::sync_replica(replica, &records).await {
                Ok(()) => {
                    debug!(replica = index, records = records.len(), "full sync applied");
                    self.status.record_outcome(index, true);
                }
                Err(err) => {
                    warn!(replica = index, error = %err, "full sync failed for replica");
                    self.status.record_outcome(index, false);
                }
            }
        }

        Ok(())
    }

    /// Spawn the periodic full sync timer. The caller is expected to have
    /// run the cold-start pass already, so the interval's immediate first
    /// tick is consumed.
    pub fn spawn_full_sync_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        info!(
            interval_secs = self.config.full_sync_interval_secs,
            "starting full sync loop"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.config.full_sync_interval());
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = engine.full_sync().await {
                    warn!(error = %err, "periodic full sync failed");
                }
            }
        })
    }

    async fn sync_replica(replica: &RegionStore, records: &[Record]) -> Result<()> {
        replica.ensure_schema().await?;
        for record in records {
            replica.upsert(record).await?;
        }
        Ok(())
    }

    async fn replica_worker(
        index: usize,
        store: RegionStore,
        status: Arc<StatusTracker>,
        inflight: Arc<Inflight>,
        mut queue: mpsc::UnboundedReceiver<ReplicationTask>,
    ) {
        while let Some(task) = queue.recv().await {
            sleep(task.delay).await;

            match Self::apply(&store, &task).await {
                Ok(()) => {
                    let lag_ms = (Utc::now() - task.scheduled_at).num_milliseconds();
                    debug!(replica = index, id = task.record.id, lag_ms, "record propagated");
                    status.record_outcome(index, true);
                }
                Err(err) => {
                    let err = StoreError::Replication {
                        replica: store.id().to_string(),
                        reason: err.to_string(),
                    };
                    warn!(
                        replica = index,
                        id = task.record.id,
                        error = %err,
                        "propagation failed; next full sync repairs this replica"
                    );
                    status.record_outcome(index, false);
                }
            }

            inflight.complete();
        }
    }

    async fn apply(store: &RegionStore, task: &ReplicationTask) -> Result<()> {
        store.ensure_schema().await?;
        store.upsert(&task.record).await
    }
}

impl Replicate for Replicator {
    fn schedule(&self, record: Record) {
        Replicator::schedule(self, record);
    }

    fn full_sync(&self) -> impl Future<Output = Result<()>> + Send {
        Replicator::full_sync(self)
    }
}
