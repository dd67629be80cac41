use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bid_store: BidStoreConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub startup: StartupConfig,
}

/// HTTP surface for metrics and status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    9090
}

/// Relational database holding the campaign catalog and the decision ledger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bidpipe.db")
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BidStoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl BidStoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStoreBackend::Memory => "memory",
            BidStoreBackend::Sqlite => "sqlite",
        }
    }
}

/// Windowed bid store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BidStoreConfig {
    #[serde(default)]
    pub backend: BidStoreBackend,
    /// Database file (sqlite backend only)
    #[serde(default = "default_bid_store_path")]
    pub path: PathBuf,
    /// Retention horizon per bid in seconds (default: 24h)
    #[serde(default = "default_retention")]
    pub retention_secs: u64,
    /// Keys examined per scan page
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
    /// How often expired bids are physically removed
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl BidStoreConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for BidStoreConfig {
    fn default() -> Self {
        Self {
            backend: BidStoreBackend::default(),
            path: default_bid_store_path(),
            retention_secs: default_retention(),
            scan_page_size: default_scan_page_size(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_bid_store_path() -> PathBuf {
    PathBuf::from("bidpipe-bids.db")
}

fn default_retention() -> u64 {
    24 * 60 * 60
}

fn default_scan_page_size() -> usize {
    crate::bid_store::DEFAULT_SCAN_PAGE_SIZE
}

fn default_sweep_interval() -> u64 {
    60
}

/// Pricing model source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("pricing_model.json")
}

/// Bid event stream input
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamConfig {
    /// NDJSON file to read bids from. Reads stdin when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Replay mode: once the stream ends, run one final tick and exit.
    /// Otherwise the process keeps deciding on the stored window until
    /// it is signalled.
    #[serde(default)]
    pub exit_on_end: bool,
}

/// Boot-time checks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StartupConfig {
    /// Deadline for each backend connectivity probe in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl StartupConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_probe_timeout() -> u64 {
    5
}

/// Sanitized config for API responses (filesystem layout hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub bid_store: SanitizedBidStoreConfig,
    pub stream: SanitizedStreamConfig,
    pub orchestrator: OrchestratorConfig,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBidStoreConfig {
    pub backend: String,
    pub retention_secs: u64,
    pub scan_page_size: usize,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStreamConfig {
    /// "file" or "stdin"
    pub source: String,
    pub exit_on_end: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            bid_store: SanitizedBidStoreConfig {
                backend: config.bid_store.backend.as_str().to_string(),
                retention_secs: config.bid_store.retention_secs,
                scan_page_size: config.bid_store.scan_page_size,
                sweep_interval_secs: config.bid_store.sweep_interval_secs,
            },
            stream: SanitizedStreamConfig {
                source: match config.stream.path {
                    Some(_) => "file".to_string(),
                    None => "stdin".to_string(),
                },
                exit_on_end: config.stream.exit_on_end,
            },
            orchestrator: config.orchestrator.clone(),
            startup: config.startup.clone(),
        }
    }
}
