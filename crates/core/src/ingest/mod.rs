//! Ingestion worker: stream → decode → bid store.
//!
//! A single cooperative consumer loop. Each message is decoded and written
//! once; decode failures and store failures are counted and the message is
//! dropped. Nothing is buffered beyond the current message.

mod types;
mod worker;

pub use types::{IngestError, IngestState, IngestStats};
pub use worker::{IngestionHandle, IngestionWorker};
