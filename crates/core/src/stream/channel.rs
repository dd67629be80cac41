use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BidStream, StreamError, StreamMessage};

/// Stream fed by an in-process channel of raw payloads.
pub struct ChannelBidStream {
    rx: mpsc::Receiver<Vec<u8>>,
    next_offset: u64,
}

impl ChannelBidStream {
    pub fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx, next_offset: 0 }
    }

    /// Create a stream together with the sender that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl BidStream for ChannelBidStream {
    async fn recv(&mut self) -> Result<Option<StreamMessage>, StreamError> {
        Ok(self.rx.recv().await.map(|payload| {
            let offset = self.next_offset;
            self.next_offset += 1;
            StreamMessage { offset, payload }
        }))
    }
}
