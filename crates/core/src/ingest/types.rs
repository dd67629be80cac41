//! Types for the ingestion worker.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stream::StreamError;

/// Lifecycle of the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    /// Pulling and processing messages.
    Running,
    /// Shutdown observed; the loop is winding down.
    Draining,
    /// The loop has exited.
    Stopped,
}

impl IngestState {
    pub(super) fn as_u8(self) -> u8 {
        match self {
            IngestState::Running => 0,
            IngestState::Draining => 1,
            IngestState::Stopped => 2,
        }
    }

    pub(super) fn from_u8(value: u8) -> Self {
        match value {
            0 => IngestState::Running,
            1 => IngestState::Draining,
            _ => IngestState::Stopped,
        }
    }
}

/// Outcome counters for one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Messages pulled from the stream.
    pub received: u64,
    /// Messages decoded and written to the bid store.
    pub processed: u64,
    /// Messages dropped because they did not decode.
    pub decode_errors: u64,
    /// Decoded bids dropped because the store write failed.
    pub store_errors: u64,
}

/// Errors that end the ingestion loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("bid stream failed: {0}")]
    Stream(#[from] StreamError),
}
