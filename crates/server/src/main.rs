use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tokio::signal;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bidpipe_core::{
    load_config, load_config_from_env, load_pricing_model, probe_backend, spawn_expiry_sweeper,
    validate_config, BidStore, BidStoreBackend, CampaignCatalog, Config, DecisionLedger,
    DecisionOrchestrator, IngestionWorker, LineBidStream, MemoryBidStore, SqliteBidStore,
    SqliteCampaignCatalog, SqliteDecisionLedger, StartupError,
};
use bidpipe_server::{api::create_router, metrics::ServerMetrics, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
    // A stdin read parked on the blocking pool would otherwise hold the runtime open.
    std::process::exit(0);
}

fn load_configuration() -> Result<Config> {
    let explicit = std::env::var("BIDPIPE_CONFIG").map(PathBuf::from).ok();
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if explicit.is_some() || config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .map_err(StartupError::from)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file found, using defaults and environment");
        load_config_from_env()
            .map_err(StartupError::from)
            .context("Failed to load config from environment")?
    };

    validate_config(&config)
        .map_err(StartupError::from)
        .context("Configuration validation failed")?;
    Ok(config)
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_configuration()?;
    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Bid store backend: {}", config.bid_store.backend.as_str());

    let metrics = ServerMetrics::new().context("Failed to create metrics registry")?;

    // Pricing model: absent or malformed is fatal
    let model = match load_pricing_model(&config.pricing.model_path) {
        Ok(model) => model,
        Err(e) => {
            metrics.pipeline().set_pricing_model_loaded(false);
            return Err(StartupError::from(e)).with_context(|| {
                format!(
                    "Failed to load pricing model from {:?}",
                    config.pricing.model_path
                )
            });
        }
    };
    metrics.pipeline().set_pricing_model_loaded(true);
    info!(
        "Pricing model loaded ({} coefficients)",
        model.coefficients.len()
    );
    let model = Arc::new(model);

    // Campaign catalog and decision ledger share the relational database
    let catalog: Arc<dyn CampaignCatalog> = Arc::new(
        SqliteCampaignCatalog::new(&config.database.path)
            .context("Failed to open campaign catalog")?,
    );
    let ledger = Arc::new(
        SqliteDecisionLedger::new(&config.database.path)
            .context("Failed to open decision ledger")?,
    );

    let bid_store: Arc<dyn BidStore> = match config.bid_store.backend {
        BidStoreBackend::Memory => Arc::new(
            MemoryBidStore::new(config.bid_store.retention())
                .with_page_size(config.bid_store.scan_page_size),
        ),
        BidStoreBackend::Sqlite => Arc::new(
            SqliteBidStore::new(&config.bid_store.path, config.bid_store.retention())
                .context("Failed to open bid store")?
                .with_page_size(config.bid_store.scan_page_size),
        ),
    };

    // Connectivity probes, bounded by the startup deadline
    let deadline = config.startup.probe_timeout();
    probe_backend("bid store", deadline, bid_store.ping()).await?;
    probe_backend("campaign catalog", deadline, catalog.ping()).await?;
    probe_backend("decision ledger", deadline, ledger.ping()).await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Ingestion worker
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &config.stream.path {
        Some(path) => {
            info!("Reading bid events from {:?}", path);
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open bid stream {:?}", path))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading bid events from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };
    let worker = IngestionWorker::new(
        LineBidStream::new(reader),
        Arc::clone(&bid_store),
        metrics.pipeline().clone(),
    );
    let ingestion = worker.handle();
    let (ingest_done_tx, ingest_done_rx) = oneshot::channel();
    let ingest_rx = shutdown_tx.subscribe();
    let ingest_task = tokio::spawn(async move {
        let result = worker.run(ingest_rx).await;
        match &result {
            Ok(_) => info!("Bid stream drained; decisions continue on the stored window"),
            Err(e) => warn!("Ingestion stopped: {}; decisions continue on the stored window", e),
        }
        let _ = ingest_done_tx.send(());
        result
    });

    // Expiry sweeper
    let sweeper_task = spawn_expiry_sweeper(
        Arc::clone(&bid_store),
        config.bid_store.sweep_interval(),
        metrics.pipeline().clone(),
        shutdown_tx.subscribe(),
    );

    // Decision orchestrator
    let orchestrator = Arc::new(DecisionOrchestrator::new(
        config.orchestrator.clone(),
        catalog,
        Arc::clone(&bid_store),
        Arc::clone(&ledger) as Arc<dyn DecisionLedger>,
        model,
        metrics.pipeline().clone(),
    ));
    orchestrator.start().await;

    // HTTP surface
    let exit_on_end = config.stream.exit_on_end;
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(
        config,
        metrics,
        bid_store,
        ledger,
        Arc::clone(&orchestrator),
        Some(ingestion),
    ));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Only replay mode ties the process lifetime to the stream
    let replay_done = exit_on_end.then_some(ingest_done_rx);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(replay_done, Arc::clone(&orchestrator)))
        .await
        .context("Server error")?;

    info!("Shutting down...");
    let _ = shutdown_tx.send(());

    // Let the in-flight tick drain before anything else goes away
    orchestrator.stop().await;

    match ingest_task.await {
        Ok(Ok(stats)) => info!(
            "Ingestion finished (processed: {}, decode errors: {}, store errors: {})",
            stats.processed, stats.decode_errors, stats.store_errors
        ),
        Ok(Err(e)) => warn!("Ingestion ended with error: {}", e),
        Err(e) => error!("Ingestion task failed: {}", e),
    }
    let _ = sweeper_task.await;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
///
/// In replay mode the end of the stream also counts, after one final tick
/// over everything that was ingested.
async fn shutdown_signal(
    replay_done: Option<oneshot::Receiver<()>>,
    orchestrator: Arc<DecisionOrchestrator>,
) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let replay_finished = async {
        let Some(done) = replay_done else {
            return std::future::pending::<()>().await;
        };
        let _ = done.await;
        info!("Bid stream ended in replay mode, running a final tick");
        match orchestrator.run_tick().await {
            Ok(report) => info!(
                "Final tick {} saved {} decisions ({} failures)",
                report.tick,
                report.decisions_saved,
                report.failures.len()
            ),
            Err(e) => warn!("Final tick failed: {}", e),
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
        _ = replay_finished => info!("Replay complete"),
    }
}
