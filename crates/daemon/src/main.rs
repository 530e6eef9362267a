//! Ingest Flow - Main Entry Point
//! Composition root: configuration, logging, DI wiring, auto-ingest, RPC, shutdown

mod config;
mod logging;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use config::DaemonConfig;
use ingestflow_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use ingestflow_core::application::constants::SHUTDOWN_DRAIN_TIMEOUT;
use ingestflow_core::application::{
    shutdown_channel, Area, AreaKind, AutoIngestScanner, BlockedTargetService, EnqueuingService,
    IngestContext, TargetedTaskSequenceManager, TaskEventService,
};
use ingestflow_core::port::time_provider::SystemTimeProvider;
use ingestflow_core::port::{DepositStore, TimeProvider};
use ingestflow_infra_fs::{BagMetadataMapper, FsDepositStore};
use ingestflow_infra_http::{HttpBagValidator, HttpRemoteRepository};
use ingestflow_infra_sqlite::{
    create_pool, database_url, run_migrations, SqliteBlockedTargetRepository,
    SqliteTaskEventRepository,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "ingest-flow")]
#[command(about = "Ingest Flow daemon", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = "INGESTFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = DaemonConfig::load(args.config.as_deref())?;

    // 2. Initialize logging
    let _log_guard = logging::init(&config.logging, &config.telemetry)?;
    info!("Ingest Flow v{} starting...", VERSION);

    // 3. Initialize database
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(db_path = %db_path.display(), "Initializing database...");
    let pool = create_pool(&database_url(&db_path))
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let events = Arc::new(TaskEventService::new(
        Arc::new(SqliteTaskEventRepository::new(pool.clone())),
        time_provider.clone(),
    ));
    let blocked = Arc::new(BlockedTargetService::new(
        Arc::new(SqliteBlockedTargetRepository::new(pool.clone())),
        time_provider,
    ));
    let store: Arc<dyn DepositStore> = Arc::new(FsDepositStore::new());
    let remote = HttpRemoteRepository::new(config.remote_settings())
        .map_err(|e| anyhow::anyhow!("Remote repository client setup failed: {}", e))?;
    let validator = HttpBagValidator::new(
        &config.validator.base_url,
        std::time::Duration::from_secs(config.validator.timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("Validator client setup failed: {}", e))?;

    let ctx = Arc::new(IngestContext {
        store: store.clone(),
        remote: Arc::new(remote),
        validator: Arc::new(validator),
        mapper: Arc::new(BagMetadataMapper::new()),
        blocked: blocked.clone(),
        events: events.clone(),
        settings: config.ingest_settings(),
    });

    let manager = Arc::new(TargetedTaskSequenceManager::new(
        config.ingest.worker_pool_size,
    ));
    let enqueuer = Arc::new(EnqueuingService::new(
        ctx,
        manager.clone(),
        config.ingest.max_concurrent_enqueues,
    ));

    let areas: Vec<Arc<Area>> = config
        .area_configs()
        .into_iter()
        .map(|area| Arc::new(Area::new(area, store.clone(), enqueuer.clone())))
        .collect();
    if areas.is_empty() {
        warn!("No areas configured; only the operator API is available");
    }
    for area in &areas {
        info!(
            area = %area.kind(),
            inbox = %area.config().inbox.display(),
            outbox = %area.config().outbox.display(),
            publish = area.config().publish,
            "Area configured"
        );
    }

    // 5. Start auto-ingest scanner
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scanner_handle = areas
        .iter()
        .find(|area| area.kind() == AreaKind::AutoIngest)
        .map(|area| {
            let scanner = AutoIngestScanner::new(
                area.clone(),
                store.clone(),
                config.auto_ingest_poll_interval(),
            );
            tokio::spawn(scanner.run(shutdown_rx.clone()))
        });

    // 6. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_config = RpcServerConfig {
        host: config.rpc.host.clone(),
        port: config.rpc.port,
    };
    let handler = RpcHandler::new(areas, blocked, events, manager.clone());
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(rpc = %rpc_addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: stop intake, then drain in-flight sequences
    shutdown_tx.shutdown();
    if let Err(e) = rpc_handle.stop() {
        error!(error = %e, "RPC server stop failed");
    }
    if let Some(handle) = scanner_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Auto-ingest scanner failed");
        }
    }

    let stats = manager.stats();
    info!(
        active_targets = stats.active_targets,
        running_tasks = stats.running_tasks,
        "Waiting for in-flight deposits..."
    );
    if manager.drain(SHUTDOWN_DRAIN_TIMEOUT).await {
        info!("All deposit sequences finished");
    } else {
        warn!(
            timeout_secs = SHUTDOWN_DRAIN_TIMEOUT.as_secs(),
            "Shutdown drain timed out; unfinished deposits resume on the next import"
        );
    }

    pool.close().await;
    telemetry::shutdown();
    info!("Shutdown complete.");

    Ok(())
}
