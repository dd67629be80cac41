//! Ingestion worker implementation.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::types::{IngestError, IngestState, IngestStats};
use crate::bid_store::BidStore;
use crate::metrics::PipelineMetrics;
use crate::model::BidEvent;
use crate::stream::{BidStream, StreamMessage};

/// State shared between the worker and its handles.
struct Shared {
    state: AtomicU8,
    received: AtomicU64,
    processed: AtomicU64,
    decode_errors: AtomicU64,
    store_errors: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(IngestState::Running.as_u8()),
            received: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    fn set_state(&self, state: IngestState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn stats(&self) -> IngestStats {
        IngestStats {
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view of a running worker. Cheap to clone.
#[derive(Clone)]
pub struct IngestionHandle {
    shared: Arc<Shared>,
}

impl IngestionHandle {
    pub fn state(&self) -> IngestState {
        IngestState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> IngestStats {
        self.shared.stats()
    }
}

/// Consumes bid events from a stream and writes them into the bid store.
pub struct IngestionWorker<S: BidStream> {
    stream: S,
    sink: BidSink,
}

/// Decode-and-store half of the worker, kept apart from the stream so it can
/// be borrowed while the stream is mutably borrowed.
struct BidSink {
    store: Arc<dyn BidStore>,
    metrics: PipelineMetrics,
    shared: Arc<Shared>,
}

impl<S: BidStream> IngestionWorker<S> {
    pub fn new(stream: S, store: Arc<dyn BidStore>, metrics: PipelineMetrics) -> Self {
        Self {
            stream,
            sink: BidSink {
                store,
                metrics,
                shared: Arc::new(Shared::new()),
            },
        }
    }

    /// Handle for observing state and counters while `run` owns the worker.
    pub fn handle(&self) -> IngestionHandle {
        IngestionHandle {
            shared: Arc::clone(&self.sink.shared),
        }
    }

    /// Run until shutdown is signalled, the stream closes, or the transport fails.
    ///
    /// Shutdown is observed between messages; a pending receive is abandoned
    /// rather than waited on.
    pub async fn run(
        mut self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<IngestStats, IngestError> {
        info!("Ingestion worker started");
        let shared = Arc::clone(&self.sink.shared);

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => None,
                received = self.stream.recv() => Some(received),
            };

            match next {
                None => {
                    info!("Ingestion worker received shutdown signal");
                    shared.set_state(IngestState::Draining);
                    break Ok(());
                }
                Some(Ok(Some(message))) => self.sink.process(message).await,
                Some(Ok(None)) => {
                    info!("Bid stream closed");
                    shared.set_state(IngestState::Draining);
                    break Ok(());
                }
                Some(Err(e)) => {
                    warn!("Bid stream failed: {}", e);
                    shared.set_state(IngestState::Draining);
                    break Err(IngestError::from(e));
                }
            }
        };

        shared.set_state(IngestState::Stopped);
        let stats = shared.stats();
        info!(
            "Ingestion worker stopped (received: {}, processed: {}, decode errors: {}, store errors: {})",
            stats.received, stats.processed, stats.decode_errors, stats.store_errors
        );
        result.map(|()| stats)
    }
}

impl BidSink {
    /// Decode and store one message. Never fails: every outcome is counted.
    async fn process(&self, message: StreamMessage) {
        self.shared.received.fetch_add(1, Ordering::Relaxed);

        let bid = match BidEvent::decode(&message.payload) {
            Ok(bid) => bid,
            Err(e) => {
                warn!("Dropping message at offset {}: {}", message.offset, e);
                self.shared.decode_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_decode_error();
                return;
            }
        };

        match self.store.put(&bid).await {
            Ok(()) => {
                self.shared.processed.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_bid_processed();
                debug!(
                    "Stored bid for campaign {} on {}",
                    bid.campaign_id, bid.platform
                );
            }
            Err(e) => {
                warn!(
                    "Failed to store bid for campaign {}: {}",
                    bid.campaign_id, e
                );
                self.shared.store_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.record_store_error();
            }
        }
    }
}
