//! Common test utilities for exercising the HTTP surface in-process.
//!
//! The fixture wires the real router over an in-memory bid store, an
//! in-memory SQLite decision ledger, a mock campaign catalog, and an
//! ingestion worker fed from a channel.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceExt;

use bidpipe_core::{
    testing::MockCampaignCatalog, BidEvent, BidStore, ChannelBidStream, Config,
    DecisionOrchestrator, IngestionHandle, IngestionWorker, MemoryBidStore, SqliteDecisionLedger,
};
use bidpipe_server::{api::create_router, metrics::ServerMetrics, state::AppState};

/// Re-export fixtures for test convenience
pub use bidpipe_core::testing::fixtures;

/// In-process server with controllable dependencies.
pub struct TestFixture {
    pub router: Router,
    /// Campaigns the orchestrator sees on each tick
    pub catalog: MockCampaignCatalog,
    pub store: Arc<MemoryBidStore>,
    pub orchestrator: Arc<DecisionOrchestrator>,
    pub metrics: ServerMetrics,
    /// Raw payloads pushed here reach the ingestion worker
    pub bids: mpsc::Sender<Vec<u8>>,
    pub ingestion: IngestionHandle,
    shutdown_tx: broadcast::Sender<()>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let config = Config::default();
        let metrics = ServerMetrics::new().expect("Failed to create metrics");

        let catalog = MockCampaignCatalog::new();
        let store = Arc::new(MemoryBidStore::new(Duration::from_secs(3600)));
        let ledger = Arc::new(SqliteDecisionLedger::in_memory().expect("Failed to open ledger"));

        let orchestrator = Arc::new(DecisionOrchestrator::new(
            config.orchestrator.clone(),
            Arc::new(catalog.clone()),
            store.clone(),
            ledger.clone(),
            Arc::new(fixtures::pricing_model(&[("google", 2.0)], 1.5)),
            metrics.pipeline().clone(),
        ));

        let (bids, stream) = ChannelBidStream::channel(64);
        let worker = IngestionWorker::new(stream, store.clone(), metrics.pipeline().clone());
        let ingestion = worker.handle();
        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let _ = worker.run(shutdown_rx).await;
        });

        let state = Arc::new(AppState::new(
            config,
            metrics.clone(),
            store.clone(),
            ledger,
            orchestrator.clone(),
            Some(ingestion.clone()),
        ));

        Self {
            router: create_router(state),
            catalog,
            store,
            orchestrator,
            metrics,
            bids,
            ingestion,
            shutdown_tx,
        }
    }

    /// Write a bid straight into the store, bypassing ingestion.
    pub async fn put_bid(&self, event: &BidEvent) {
        self.store.put(event).await.expect("Failed to store bid");
    }

    /// Push a raw payload through the ingestion worker and wait until it is handled.
    pub async fn ingest(&self, payload: &[u8]) {
        let before = self.ingestion.stats().received;
        self.bids
            .send(payload.to_vec())
            .await
            .expect("Ingestion worker is gone");

        for _ in 0..200 {
            let stats = self.ingestion.stats();
            if stats.received > before
                && stats.processed + stats.decode_errors + stats.store_errors >= stats.received
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("Ingestion did not handle the payload in time");
    }

    /// Signal the ingestion worker to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        self.shutdown();
    }
}
