use super::error::{Result, StoreError};
use super::record::{NewRecord, Record};
use super::region::Region;
use crate::config::StoresConfig;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Identity of a backing store: the master, or the replica at slot `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreId {
    Master,
    Replica(usize),
}

impl StoreId {
    pub fn is_master(self) -> bool {
        matches!(self, StoreId::Master)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreId::Master => f.write_str("master"),
            StoreId::Replica(i) => write!(f, "replica-{}", i + 1),
        }
    }
}

/// A per-region record store behind a simulated connection pool.
///
/// This is the system's stand-in for one regional database. Every operation
/// is fallible and bounded by the configured timeout: the store can be taken
/// offline (connectivity errors), it can be given an artificial per-call
/// latency, and row operations fail until the `records` table has been
/// created. Schema creation is idempotent and safe under concurrent callers,
/// matching a `CREATE TABLE IF NOT EXISTS` issued on first propagation.
#[derive(Clone)]
pub struct RegionStore {
    id: StoreId,
    op_timeout: Duration,
    inner: Arc<StoreInner>,
}

struct StoreInner {
    online: AtomicBool,
    schema_ready: AtomicBool,
    next_id: AtomicI64,
    call_latency: RwLock<Duration>,
    rows: RwLock<BTreeMap<i64, Record>>,
}

impl RegionStore {
    /// Establish the simulated pool for one store. This is the seam where a
    /// real driver would dial the regional database; startup code retries it
    /// with backoff, mid-operation code never does.
    pub async fn connect(id: StoreId, op_timeout: Duration) -> Result<Self> {
        debug!(store = %id, "opening store pool");
        Ok(Self {
            id,
            op_timeout,
            inner: Arc::new(StoreInner {
                online: AtomicBool::new(true),
                schema_ready: AtomicBool::new(false),
                next_id: AtomicI64::new(1),
                call_latency: RwLock::new(Duration::ZERO),
                rows: RwLock::new(BTreeMap::new()),
            }),
        })
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Take the store on or off line. While offline every call fails with a
    /// connectivity error, the way an unreachable regional database would.
    pub fn set_online(&self, online: bool) {
        if !online {
            warn!(store = %self.id, "store marked offline");
        }
        self.inner.online.store(online, Ordering::Release);
    }

    /// Add an artificial delay to every call, for exercising timeouts.
    pub fn induce_call_latency(&self, latency: Duration) {
        *self.inner.call_latency.write() = latency;
    }

    /// Create the `records` table if it does not exist. Idempotent.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.checkout("ensure_schema").await?;
        if !self.inner.schema_ready.swap(true, Ordering::AcqRel) {
            debug!(store = %self.id, "records table created");
        }
        Ok(())
    }

    /// Insert a new row, assigning id and creation timestamp, and return the
    /// full record. Master only: replicas never originate rows.
    pub async fn insert_returning(&self, new: NewRecord, origin: Region) -> Result<Record> {
        self.checkout("insert").await?;
        if !self.id.is_master() {
            return Err(StoreError::Constraint(
                "writes must go to the master store".into(),
            ));
        }
        self.require_schema()?;

        let record = Record {
            id: self.inner.next_id.fetch_add(1, Ordering::AcqRel),
            title: new.title,
            summary: new.summary,
            body: new.body,
            author: new.author,
            region: origin,
            created_at: Utc::now(),
        };
        self.inner.rows.write().insert(record.id, record.clone());
        Ok(record)
    }

    /// Insert-or-overwrite keyed by id. The only conflict-resolution rule in
    /// the system: the last upsert for a given id wins.
    pub async fn upsert(&self, record: &Record) -> Result<()> {
        self.checkout("upsert").await?;
        self.require_schema()?;
        self.inner.rows.write().insert(record.id, record.clone());
        Ok(())
    }

    /// Point delete by id. Idempotent: succeeds even if no row matched.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.checkout("delete").await?;
        self.require_schema()?;
        Ok(self.inner.rows.write().remove(&id).is_some())
    }

    /// All rows, ordered by creation time descending (id breaks ties).
    pub async fn select_all(&self) -> Result<Vec<Record>> {
        self.checkout("select_all").await?;
        self.require_schema()?;
        let mut rows: Vec<Record> = self.inner.rows.read().values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        self.checkout("count").await?;
        self.require_schema()?;
        Ok(self.inner.rows.read().len() as u64)
    }

    pub async fn latest_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.checkout("max_created_at").await?;
        self.require_schema()?;
        Ok(self
            .inner
            .rows
            .read()
            .values()
            .map(|r| r.created_at)
            .max())
    }

    /// Simulates checking a connection out of the pool: applies induced
    /// latency under the operation timeout, then verifies reachability.
    async fn checkout(&self, op: &'static str) -> Result<()> {
        let latency = *self.inner.call_latency.read();
        if !latency.is_zero()
            && tokio::time::timeout(self.op_timeout, tokio::time::sleep(latency))
                .await
                .is_err()
        {
            return Err(StoreError::Timeout {
                store: self.id.to_string(),
                op,
                timeout_ms: self.op_timeout.as_millis() as u64,
            });
        }
        if !self.inner.online.load(Ordering::Acquire) {
            return Err(StoreError::Connectivity(self.id.to_string()));
        }
        Ok(())
    }

    fn require_schema(&self) -> Result<()> {
        if self.inner.schema_ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::SchemaMissing(self.id.to_string()))
        }
    }
}

/// The master store plus every regional replica store.
pub struct StoreSet {
    master: RegionStore,
    replicas: Vec<RegionStore>,
}

impl StoreSet {
    /// Open pools for the master and the configured number of replicas.
    pub async fn connect(config: &StoresConfig) -> Result<Self> {
        let op_timeout = config.op_timeout();
        let master = RegionStore::connect(StoreId::Master, op_timeout).await?;
        let mut replicas = Vec::with_capacity(config.replicas);
        for index in 0..config.replicas {
            replicas.push(RegionStore::connect(StoreId::Replica(index), op_timeout).await?);
        }
        info!(replicas = replicas.len(), "store pools opened");
        Ok(Self { master, replicas })
    }

    pub fn master(&self) -> &RegionStore {
        &self.master
    }

    pub fn replicas(&self) -> &[RegionStore] {
        &self.replicas
    }

    pub fn replica(&self, index: usize) -> Option<&RegionStore> {
        self.replicas.get(index)
    }

    pub fn num_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// Pick the read target for a region: the mapped replica when its slot
    /// exists, otherwise the master. The fallback is a designed default, not
    /// an error; a missing replica must never fail a read.
    pub fn pool_for_region(&self, region: Region) -> &RegionStore {
        match region.replica_index() {
            Some(index) if index < self.replicas.len() => &self.replicas[index],
            _ => &self.master,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoresConfig;

    fn sample(n: u32) -> NewRecord {
        NewRecord {
            title: format!("title {n}"),
            summary: format!("summary {n}"),
            body: format!("body {n}"),
            author: "tester".into(),
        }
    }

    async fn master_store() -> RegionStore {
        let store = RegionStore::connect(StoreId::Master, Duration::from_secs(5))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_assigns_monotonic_ids() {
        let store = master_store().await;
        let a = store.insert_returning(sample(1), Region::Eu).await.unwrap();
        let b = store.insert_returning(sample(2), Region::Eu).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        // Ids are never reused, even after a delete.
        assert!(store.delete(b.id).await.unwrap());
        let c = store.insert_returning(sample(3), Region::Eu).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_select_all_orders_newest_first() {
        let store = master_store().await;
        for n in 0..3 {
            store.insert_returning(sample(n), Region::Eu).await.unwrap();
        }
        let rows = store.select_all().await.unwrap();
        assert_eq!(rows.len(), 3);
        // Identical timestamps are possible at this resolution; id breaks ties.
        assert!(rows[0].id > rows[1].id && rows[1].id > rows[2].id);
    }

    #[tokio::test]
    async fn test_count_and_latest_timestamp() {
        let store = master_store().await;
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.latest_created_at().await.unwrap(), None);

        store.insert_returning(sample(1), Region::Eu).await.unwrap();
        let newest = store.insert_returning(sample(2), Region::Eu).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.latest_created_at().await.unwrap(),
            Some(newest.created_at)
        );
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = master_store().await;
        let rec = store.insert_returning(sample(1), Region::Eu).await.unwrap();
        assert!(store.delete(rec.id).await.unwrap());
        assert!(!store.delete(rec.id).await.unwrap());
        assert!(!store.delete(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_overwrite() {
        let store = master_store().await;
        let rec = store.insert_returning(sample(1), Region::Eu).await.unwrap();

        let replica = RegionStore::connect(StoreId::Replica(0), Duration::from_secs(5))
            .await
            .unwrap();
        replica.ensure_schema().await.unwrap();

        replica.upsert(&rec).await.unwrap();
        replica.upsert(&rec).await.unwrap();
        let rows = replica.select_all().await.unwrap();
        assert_eq!(rows, vec![rec]);
    }

    #[tokio::test]
    async fn test_replica_rejects_direct_inserts() {
        let replica = RegionStore::connect(StoreId::Replica(0), Duration::from_secs(5))
            .await
            .unwrap();
        replica.ensure_schema().await.unwrap();
        let err = replica
            .insert_returning(sample(1), Region::Eu)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_row_ops_require_schema() {
        let replica = RegionStore::connect(StoreId::Replica(2), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(matches!(
            replica.select_all().await,
            Err(StoreError::SchemaMissing(_))
        ));

        // ensure_schema is idempotent and unlocks row operations.
        replica.ensure_schema().await.unwrap();
        replica.ensure_schema().await.unwrap();
        assert_eq!(replica.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_store_reports_connectivity_error() {
        let store = master_store().await;
        store.set_online(false);
        assert!(matches!(
            store.select_all().await,
            Err(StoreError::Connectivity(_))
        ));
        store.set_online(true);
        assert!(store.select_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let store = RegionStore::connect(StoreId::Replica(0), Duration::from_millis(20))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store.induce_call_latency(Duration::from_millis(200));
        assert!(matches!(
            store.count().await,
            Err(StoreError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_pool_for_region_routing_and_fallback() {
        let config = StoresConfig {
            replicas: 4,
            ..Default::default()
        };
        let stores = StoreSet::connect(&config).await.unwrap();

        assert_eq!(
            stores.pool_for_region(Region::Us).id(),
            StoreId::Replica(0)
        );
        assert_eq!(
            stores.pool_for_region(Region::Asia).id(),
            StoreId::Replica(1)
        );
        assert_eq!(stores.pool_for_region(Region::Sa).id(), StoreId::Replica(2));
        assert_eq!(
            stores.pool_for_region(Region::Africa).id(),
            StoreId::Replica(3)
        );
        assert_eq!(stores.pool_for_region(Region::Eu).id(), StoreId::Master);

        // Shrunken replica set: out-of-range slots fall back to the master.
        let small = StoreSet::connect(&StoresConfig {
            replicas: 2,
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(small.pool_for_region(Region::Sa).id(), StoreId::Master);
        assert_eq!(small.pool_for_region(Region::Africa).id(), StoreId::Master);

        // Empty replica set: every region reads from the master.
        let empty = StoreSet::connect(&StoresConfig {
            replicas: 0,
            ..Default::default()
        })
        .await
        .unwrap();
        for region in Region::ALL {
            assert_eq!(empty.pool_for_region(region).id(), StoreId::Master);
        }
    }
}
