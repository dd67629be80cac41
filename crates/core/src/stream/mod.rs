//! Bid event stream abstraction.
//!
//! The broker transport is external; ingestion only needs a blocking
//! "give me the next message" receive with at-least-once semantics.

mod channel;
mod lines;

pub use channel::ChannelBidStream;
pub use lines::LineBidStream;

use async_trait::async_trait;
use thiserror::Error;

/// One raw message pulled from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Position of the message within its stream.
    pub offset: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// The transport failed; the stream cannot make further progress.
    #[error("stream transport error: {0}")]
    Transport(String),
}

/// Source of bid event messages.
#[async_trait]
pub trait BidStream: Send {
    /// Wait for the next message.
    ///
    /// Returns `Ok(None)` once the stream is closed and fully consumed.
    async fn recv(&mut self) -> Result<Option<StreamMessage>, StreamError>;
}
