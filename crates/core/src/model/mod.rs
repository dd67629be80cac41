//! Domain types shared by ingestion, scoring and the decision orchestrator.

mod types;

pub use types::*;

use thiserror::Error;

/// A stream payload that cannot become a valid bid event.
///
/// Decode errors are never retried: a malformed payload stays malformed.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed bid payload: {0}")]
    Malformed(String),

    #[error("invalid bid event: {0}")]
    Invalid(String),
}
