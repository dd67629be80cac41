//! Prometheus metrics for the HTTP surface.
//!
//! This module owns the process registry and provides:
//! - HTTP request metrics (latency, counts, in flight)
//! - Orchestrator and ingestion status (collected at scrape time)
//! - Text exposition of everything registered, pipeline collectors included

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use bidpipe_core::{IngestState, PipelineMetrics};

use crate::state::AppState;

/// HTTP request metrics recorded by the metrics middleware.
#[derive(Clone)]
pub struct HttpMetrics {
    pub request_duration: HistogramVec,
    pub requests_total: IntCounterVec,
    pub requests_in_flight: IntGauge,
}

impl HttpMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            request_duration: HistogramVec::new(
                HistogramOpts::new(
                    "bidpipe_http_request_duration_seconds",
                    "HTTP request duration in seconds",
                )
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
                &["method", "path", "status"],
            )?,
            requests_total: IntCounterVec::new(
                Opts::new("bidpipe_http_requests_total", "Total HTTP requests"),
                &["method", "path", "status"],
            )?,
            requests_in_flight: IntGauge::new(
                "bidpipe_http_requests_in_flight",
                "Number of HTTP requests currently being processed",
            )?,
        })
    }
}

/// Gauges refreshed from live state on every scrape.
#[derive(Clone)]
struct StatusGauges {
    orchestrator_running: IntGauge,
    ingest_state: IntGauge,
}

/// Process-wide metrics: one registry, pipeline collectors, HTTP collectors.
#[derive(Clone)]
pub struct ServerMetrics {
    registry: Registry,
    pipeline: PipelineMetrics,
    http: HttpMetrics,
    status: StatusGauges,
}

impl ServerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let pipeline = PipelineMetrics::register(&registry)?;
        let http = HttpMetrics::new()?;
        let status = StatusGauges {
            orchestrator_running: IntGauge::new(
                "bidpipe_orchestrator_running",
                "Whether the decision orchestrator loop is running (1=yes, 0=no)",
            )?,
            ingest_state: IntGauge::new(
                "bidpipe_ingest_state",
                "Ingestion worker state (0=running, 1=draining, 2=stopped)",
            )?,
        };

        registry.register(Box::new(http.request_duration.clone()))?;
        registry.register(Box::new(http.requests_total.clone()))?;
        registry.register(Box::new(http.requests_in_flight.clone()))?;
        registry.register(Box::new(status.orchestrator_running.clone()))?;
        registry.register(Box::new(status.ingest_state.clone()))?;

        Ok(Self {
            registry,
            pipeline,
            http,
            status,
        })
    }

    /// Collectors to hand to the pipeline components.
    pub fn pipeline(&self) -> &PipelineMetrics {
        &self.pipeline
    }

    pub fn http(&self) -> &HttpMetrics {
        &self.http
    }

    /// Encode all registered metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Refresh gauges that mirror live state. Called on each `/metrics` scrape.
pub fn collect_dynamic_metrics(state: &AppState) {
    let metrics = state.metrics();
    metrics
        .status
        .orchestrator_running
        .set(if state.orchestrator().is_running() { 1 } else { 0 });

    let ingest = match state.ingestion().map(|h| h.state()) {
        Some(IngestState::Running) => 0,
        Some(IngestState::Draining) => 1,
        Some(IngestState::Stopped) | None => 2,
    };
    metrics.status.ingest_state.set(ingest);
}

/// Normalize a request path for use as a metric label.
///
/// Campaign ids are collapsed so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = path.split('/').collect();
    for i in 1..segments.len() {
        if segments[i - 1] == "campaigns" && !segments[i].is_empty() {
            segments[i] = ":id";
        }
    }
    segments.join("/")
}
