pub mod bid_store;
pub mod catalog;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod pricing;
pub mod startup;
pub mod stream;
pub mod testing;

pub use bid_store::{
    spawn_expiry_sweeper, BidStore, MemoryBidStore, SqliteBidStore, StoreError,
};
pub use catalog::{CampaignCatalog, CatalogError, SqliteCampaignCatalog};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, BidStoreBackend,
    Config, ConfigError, SanitizedConfig,
};
pub use ingest::{IngestError, IngestState, IngestStats, IngestionHandle, IngestionWorker};
pub use ledger::{DecisionLedger, LedgerError, SqliteDecisionLedger};
pub use metrics::PipelineMetrics;
pub use model::{BidDecision, BidEvent, Campaign, DecodeError};
pub use orchestrator::{
    CampaignFailure, DecisionOrchestrator, OrchestratorConfig, OrchestratorError,
    OrchestratorStatus, TickReport,
};
pub use pricing::{evaluate_bid, load_pricing_model, PricingError, PricingModel};
pub use startup::{probe_backend, StartupError};
pub use stream::{BidStream, ChannelBidStream, LineBidStream, StreamError, StreamMessage};
