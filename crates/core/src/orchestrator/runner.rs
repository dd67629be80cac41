//! Decision orchestrator implementation.
//!
//! One timer-driven loop. Each tick loads the active campaigns and fans out
//! one evaluation per campaign (read window, score, persist). A tick ends
//! only when every evaluation has finished, so ticks never overlap.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{broadcast, Mutex, RwLock, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::bid_store::BidStore;
use crate::catalog::CampaignCatalog;
use crate::ledger::DecisionLedger;
use crate::metrics::PipelineMetrics;
use crate::model::{BidDecision, Campaign};
use crate::pricing::{evaluate_bid, PricingModel};

use super::config::OrchestratorConfig;
use super::types::{
    CampaignError, CampaignFailure, OrchestratorError, OrchestratorStatus, TickReport,
};

/// Everything a tick needs; shared between the handle and the loop task.
struct TickContext {
    config: OrchestratorConfig,
    catalog: Arc<dyn CampaignCatalog>,
    store: Arc<dyn BidStore>,
    ledger: Arc<dyn DecisionLedger>,
    model: Arc<PricingModel>,
    metrics: PipelineMetrics,
    limiter: Option<Arc<Semaphore>>,

    // Serializes ticks so a manual run can never overlap the timer.
    tick_lock: Mutex<()>,
    ticks_started: AtomicU64,
    ticks_completed: AtomicU64,
    last_tick: RwLock<Option<(TickReport, DateTime<Utc>)>>,
}

/// The decision orchestrator - periodically prices every active campaign.
pub struct DecisionOrchestrator {
    ctx: Arc<TickContext>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DecisionOrchestrator {
    /// Create a new orchestrator. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: OrchestratorConfig,
        catalog: Arc<dyn CampaignCatalog>,
        store: Arc<dyn BidStore>,
        ledger: Arc<dyn DecisionLedger>,
        model: Arc<PricingModel>,
        metrics: PipelineMetrics,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let limiter = match config.max_concurrent_evaluations {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        Self {
            ctx: Arc::new(TickContext {
                config,
                catalog,
                store,
                ledger,
                model,
                metrics,
                limiter,
                tick_lock: Mutex::new(()),
                ticks_started: AtomicU64::new(0),
                ticks_completed: AtomicU64::new(0),
                last_tick: RwLock::new(None),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            loop_handle: Mutex::new(None),
        }
    }

    /// Start the tick loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        let period = self.ctx.config.tick_interval();
        info!(
            "Starting decision orchestrator (tick every {:?}, window {})",
            period, self.ctx.config.window_limit
        );

        let ctx = Arc::clone(&self.ctx);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("Orchestrator loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Not raced against shutdown: an in-flight fan-out always drains.
                        if let Err(e) = ctx.run_tick().await {
                            warn!("Tick skipped: {}", e);
                        }
                    }
                }
            }
            info!("Orchestrator loop stopped");
        });

        *self.loop_handle.lock().await = Some(handle);
    }

    /// Stop the loop, waiting for the current tick (if any) to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping decision orchestrator");
        let _ = self.shutdown_tx.send(());

        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Orchestrator loop ended abnormally: {}", e);
            }
        }

        info!("Decision orchestrator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run one tick immediately, outside the timer.
    pub async fn run_tick(&self) -> Result<TickReport, OrchestratorError> {
        self.ctx.run_tick().await
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let last = self.ctx.last_tick.read().await.clone();
        let (last_tick, last_tick_at) = match last {
            Some((report, at)) => (Some(report), Some(at)),
            None => (None, None),
        };

        OrchestratorStatus {
            running: self.is_running(),
            ticks_completed: self.ctx.ticks_completed.load(Ordering::Relaxed),
            last_tick,
            last_tick_at,
        }
    }
}

impl TickContext {
    async fn run_tick(self: &Arc<Self>) -> Result<TickReport, OrchestratorError> {
        let _guard = self.tick_lock.lock().await;
        let tick = self.ticks_started.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let campaigns = match self.catalog.active_campaigns().await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                error!(tick, "Failed to load active campaigns: {}", e);
                self.metrics.record_catalog_error();
                return Err(e.into());
            }
        };

        self.metrics.set_active_campaigns(campaigns.len());
        debug!(tick, campaigns = campaigns.len(), "Tick started");

        let mut report = TickReport {
            tick,
            campaigns: campaigns.len(),
            ..TickReport::default()
        };

        let mut units = JoinSet::new();
        for campaign in campaigns {
            let ctx = Arc::clone(self);
            units.spawn(async move {
                let campaign_id = campaign.id.clone();
                let result = AssertUnwindSafe(ctx.evaluate(campaign))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(CampaignError::Panicked(panic_message(panic))));
                (campaign_id, result)
            });
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((_, Ok(decision))) => {
                    report.decisions_saved += 1;
                    if decision.should_bid {
                        report.bids_placed += 1;
                    }
                }
                Ok((campaign_id, Err(e))) => {
                    warn!(campaign_id = %campaign_id, "Campaign evaluation failed: {}", e);
                    self.metrics.record_decision_failure(&campaign_id);
                    report.failures.push(CampaignFailure {
                        campaign_id,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    // Only reachable if the runtime is shutting down under us.
                    error!("Evaluation task was cancelled: {}", e);
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.ticks_completed.fetch_add(1, Ordering::Relaxed);
        self.metrics.record_tick_completed();
        *self.last_tick.write().await = Some((report.clone(), Utc::now()));

        info!(
            tick,
            campaigns = report.campaigns,
            saved = report.decisions_saved,
            bids = report.bids_placed,
            failed = report.failures.len(),
            duration_ms = report.duration_ms,
            "Tick complete"
        );

        Ok(report)
    }

    /// One unit of work: read window, score, persist.
    async fn evaluate(&self, campaign: Campaign) -> Result<BidDecision, CampaignError> {
        let _permit = match &self.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };

        self.metrics.record_campaign_started(&campaign.id);
        let started = Instant::now();

        let window = self
            .store
            .recent_bids(&campaign.id, self.config.window_limit)
            .await?;
        let decision = evaluate_bid(&campaign, &window, &self.model, Utc::now());
        self.ledger.save_decision(&decision).await?;

        self.metrics
            .observe_decision_latency(&campaign.id, started.elapsed().as_secs_f64());
        self.metrics
            .record_decision(&decision.platform, decision.should_bid);

        debug!(
            campaign_id = %campaign.id,
            window = window.len(),
            bid_amount = decision.bid_amount,
            should_bid = decision.should_bid,
            "Decision saved"
        );

        Ok(decision)
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
