use std::sync::Arc;

use bidpipe_core::{
    BidStore, Config, DecisionOrchestrator, IngestionHandle, SanitizedConfig,
    SqliteDecisionLedger,
};

use crate::metrics::ServerMetrics;

/// Shared application state
pub struct AppState {
    config: Config,
    metrics: ServerMetrics,
    store: Arc<dyn BidStore>,
    ledger: Arc<SqliteDecisionLedger>,
    orchestrator: Arc<DecisionOrchestrator>,
    ingestion: Option<IngestionHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        metrics: ServerMetrics,
        store: Arc<dyn BidStore>,
        ledger: Arc<SqliteDecisionLedger>,
        orchestrator: Arc<DecisionOrchestrator>,
        ingestion: Option<IngestionHandle>,
    ) -> Self {
        Self {
            config,
            metrics,
            store,
            ledger,
            orchestrator,
            ingestion,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &dyn BidStore {
        self.store.as_ref()
    }

    pub fn ledger(&self) -> &SqliteDecisionLedger {
        self.ledger.as_ref()
    }

    pub fn orchestrator(&self) -> &DecisionOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn ingestion(&self) -> Option<&IngestionHandle> {
        self.ingestion.as_ref()
    }
}
