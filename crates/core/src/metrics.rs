//! Prometheus metrics for the bid pipeline.
//!
//! This module provides metrics for:
//! - Ingestion (bids processed, decode and store errors)
//! - Decision orchestrator (campaigns, failures, latency, decisions)
//! - Bid store maintenance (expired entries purged)
//!
//! Collectors live in a [`PipelineMetrics`] value that is created once and
//! handed to every component, instead of process-wide statics.

use prometheus::{
    core::Collector, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry,
};

/// Latency buckets for one campaign evaluation: 0.01s then +0.05s steps.
fn decision_latency_buckets() -> Vec<f64> {
    prometheus::linear_buckets(0.01, 0.05, 20).unwrap_or_else(|_| vec![0.01, 0.1, 0.5, 1.0])
}

/// Shared handle to the pipeline's collectors. Cheap to clone.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Ingestion
    bids_processed: IntCounter,
    decode_errors: IntCounter,
    store_errors: IntCounter,

    // Orchestrator
    catalog_errors: IntCounter,
    decision_failures: IntCounterVec,
    decisions: IntCounterVec,
    campaigns_processed: IntCounterVec,
    active_campaigns: IntGauge,
    decision_latency: HistogramVec,
    ticks_completed: IntCounter,

    // Startup / maintenance
    pricing_model_loaded: IntGauge,
    expired_bids_purged: IntCounter,
}

impl PipelineMetrics {
    /// Build unregistered collectors.
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            bids_processed: IntCounter::new(
                "bidpipe_bids_processed_total",
                "Total bid events decoded and handed to the bid store",
            )?,
            decode_errors: IntCounter::new(
                "bidpipe_decode_errors_total",
                "Stream messages dropped because they did not decode to a valid bid",
            )?,
            store_errors: IntCounter::new(
                "bidpipe_store_errors_total",
                "Bid store operations that failed",
            )?,
            catalog_errors: IntCounter::new(
                "bidpipe_catalog_errors_total",
                "Ticks skipped because the campaign catalog failed",
            )?,
            decision_failures: IntCounterVec::new(
                Opts::new(
                    "bidpipe_decision_failures_total",
                    "Failures during decision making per campaign",
                ),
                &["campaign_id"],
            )?,
            decisions: IntCounterVec::new(
                Opts::new(
                    "bidpipe_decisions_total",
                    "Bid decisions persisted by platform and outcome",
                ),
                &["platform", "decision"], // decision: "bid", "skip"
            )?,
            campaigns_processed: IntCounterVec::new(
                Opts::new(
                    "bidpipe_campaigns_processed_total",
                    "Campaign evaluations started",
                ),
                &["campaign_id"],
            )?,
            active_campaigns: IntGauge::new(
                "bidpipe_active_campaigns",
                "Number of active campaigns fetched in the latest tick",
            )?,
            decision_latency: HistogramVec::new(
                HistogramOpts::new(
                    "bidpipe_decision_latency_seconds",
                    "Latency for evaluating one campaign",
                )
                .buckets(decision_latency_buckets()),
                &["campaign_id"],
            )?,
            ticks_completed: IntCounter::new(
                "bidpipe_ticks_completed_total",
                "Orchestrator ticks whose fan-out fully drained",
            )?,
            pricing_model_loaded: IntGauge::new(
                "bidpipe_pricing_model_loaded",
                "1 if the pricing model loaded successfully, 0 otherwise",
            )?,
            expired_bids_purged: IntCounter::new(
                "bidpipe_expired_bids_purged_total",
                "Bids removed from the store after their retention horizon",
            )?,
        })
    }

    /// Build collectors and register them in `registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self::new()?;
        for collector in metrics.collectors() {
            registry.register(collector)?;
        }
        Ok(metrics)
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.bids_processed.clone()),
            Box::new(self.decode_errors.clone()),
            Box::new(self.store_errors.clone()),
            Box::new(self.catalog_errors.clone()),
            Box::new(self.decision_failures.clone()),
            Box::new(self.decisions.clone()),
            Box::new(self.campaigns_processed.clone()),
            Box::new(self.active_campaigns.clone()),
            Box::new(self.decision_latency.clone()),
            Box::new(self.ticks_completed.clone()),
            Box::new(self.pricing_model_loaded.clone()),
            Box::new(self.expired_bids_purged.clone()),
        ]
    }

    // =========================================================================
    // Recording
    // =========================================================================

    pub fn record_bid_processed(&self) {
        self.bids_processed.inc();
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.inc();
    }

    pub fn record_store_error(&self) {
        self.store_errors.inc();
    }

    pub fn record_catalog_error(&self) {
        self.catalog_errors.inc();
    }

    pub fn record_decision_failure(&self, campaign_id: &str) {
        self.decision_failures
            .with_label_values(&[campaign_id])
            .inc();
    }

    pub fn record_decision(&self, platform: &str, should_bid: bool) {
        let decision = if should_bid { "bid" } else { "skip" };
        self.decisions
            .with_label_values(&[platform, decision])
            .inc();
    }

    pub fn record_campaign_started(&self, campaign_id: &str) {
        self.campaigns_processed
            .with_label_values(&[campaign_id])
            .inc();
    }

    pub fn set_active_campaigns(&self, count: usize) {
        self.active_campaigns.set(count as i64);
    }

    pub fn observe_decision_latency(&self, campaign_id: &str, seconds: f64) {
        self.decision_latency
            .with_label_values(&[campaign_id])
            .observe(seconds);
    }

    pub fn record_tick_completed(&self) {
        self.ticks_completed.inc();
    }

    pub fn set_pricing_model_loaded(&self, loaded: bool) {
        self.pricing_model_loaded.set(i64::from(loaded));
    }

    pub fn record_expired_purged(&self, removed: usize) {
        self.expired_bids_purged.inc_by(removed as u64);
    }

    // =========================================================================
    // Reading (status API and tests)
    // =========================================================================

    pub fn bids_processed(&self) -> u64 {
        self.bids_processed.get()
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.get()
    }

    pub fn store_errors(&self) -> u64 {
        self.store_errors.get()
    }

    pub fn catalog_errors(&self) -> u64 {
        self.catalog_errors.get()
    }

    pub fn decision_failures(&self, campaign_id: &str) -> u64 {
        self.decision_failures
            .with_label_values(&[campaign_id])
            .get()
    }

    pub fn decisions(&self, platform: &str, should_bid: bool) -> u64 {
        let decision = if should_bid { "bid" } else { "skip" };
        self.decisions.with_label_values(&[platform, decision]).get()
    }

    pub fn active_campaigns(&self) -> i64 {
        self.active_campaigns.get()
    }

    pub fn decision_latency_samples(&self, campaign_id: &str) -> u64 {
        self.decision_latency
            .with_label_values(&[campaign_id])
            .get_sample_count()
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.get()
    }

    pub fn pricing_model_loaded(&self) -> bool {
        self.pricing_model_loaded.get() == 1
    }

    pub fn expired_bids_purged(&self) -> u64 {
        self.expired_bids_purged.get()
    }
}
