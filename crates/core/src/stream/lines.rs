use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};

use super::{BidStream, StreamError, StreamMessage};

/// Newline-delimited JSON stream over any buffered async reader
/// (a replay file, stdin, a pipe from a broker CLI).
///
/// Lines are handed over as raw bytes, so a line that is not valid UTF-8
/// reaches the decoder like any other malformed payload. Blank lines are
/// skipped and do not consume an offset.
pub struct LineBidStream<R> {
    lines: Split<R>,
    next_offset: u64,
}

impl<R> LineBidStream<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.split(b'\n'),
            next_offset: 0,
        }
    }
}

#[async_trait]
impl<R> BidStream for LineBidStream<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<StreamMessage>, StreamError> {
        loop {
            let line = self
                .lines
                .next_segment()
                .await
                .map_err(|e| StreamError::Transport(e.to_string()))?;

            let Some(mut line) = line else {
                return Ok(None);
            };
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let offset = self.next_offset;
            self.next_offset += 1;
            return Ok(Some(StreamMessage {
                offset,
                payload: line,
            }));
        }
    }
}
