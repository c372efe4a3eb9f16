use anyhow::Result;
use clap::Parser;
use geostore_server::{
    AppState, ContentService, LatencyEstimator, NewRecord, Region, Replicator, ServerConfig,
    StatusTracker, StoreSet, create_router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "geostore-server", about = "Geo-replicated content store")]
struct Args {
    /// Path to a YAML configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    init_tracing(&config);
    info!("Starting Geostore Server v{}", env!("CARGO_PKG_VERSION"));

    // Store pools: connection establishment is the only retried step.
    let stores = Arc::new(connect_stores(&config).await?);
    stores.master().ensure_schema().await?;

    if config.seed_demo_data {
        seed_demo_records(&stores).await?;
    }

    let labels = (0..config.stores.replicas)
        .map(|index| config.stores.label(index))
        .collect();
    let status = Arc::new(StatusTracker::new(
        labels,
        config.replication.status_window(),
    ));

    let replicator = Arc::new(Replicator::new(
        Arc::clone(&stores),
        config.replication.clone(),
        Arc::clone(&status),
    ));

    // Cold-start convergence, then steady-state drift repair on a timer.
    info!("running initial full sync");
    if let Err(err) = replicator.full_sync().await {
        warn!(error = %err, "initial full sync failed; periodic sync will retry");
    }
    let _full_sync_task = replicator.spawn_full_sync_loop();

    let service = Arc::new(ContentService::new(
        stores,
        replicator,
        status,
        LatencyEstimator::new(),
    ));

    let app = create_router(AppState { service });
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Open the master and replica pools, retrying with backoff. Startup is the
/// only place connectivity is retried; mid-operation failures never are.
async fn connect_stores(config: &ServerConfig) -> Result<StoreSet> {
    let retries = config.stores.connect_retries.max(1);
    let backoff = config.stores.connect_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match StoreSet::connect(&config.stores).await {
            Ok(stores) => return Ok(stores),
            Err(err) if attempt < retries => {
                warn!(attempt, retries, error = %err, "store connection failed, retrying");
                sleep(backoff).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Seed a few demo records into an empty master so a fresh deployment has
/// something to serve. Replicas receive them through the initial full sync.
async fn seed_demo_records(stores: &StoreSet) -> Result<()> {
    if stores.master().count().await? > 0 {
        return Ok(());
    }

    info!("seeding demo records on master");
    let seeds = [
        NewRecord {
            title: "Welcome to the geo-replicated store".into(),
            summary: "How reads follow you around the world".into(),
            body: "Writes land on the EU master and copies reach every regional replica within seconds.".into(),
            author: "admin".into(),
        },
        NewRecord {
            title: "Eventual consistency in practice".into(),
            summary: "Why a fresh write may be missing from a regional read".into(),
            body: "Each replica applies changes after a simulated propagation delay, so regional listings can briefly lag the master.".into(),
            author: "admin".into(),
        },
        NewRecord {
            title: "Full sync keeps replicas honest".into(),
            summary: "Periodic reconciliation against the master".into(),
            body: "A replica that misses an incremental update converges again on the next full sync pass.".into(),
            author: "admin".into(),
        },
    ];

    for seed in seeds {
        stores.master().insert_returning(seed, Region::Eu).await?;
    }
    Ok(())
}
