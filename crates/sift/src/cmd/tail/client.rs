//! Tap client - connects to a running session's subscriber feed

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use sift_tap::{FeedMessage, SubscribeRequest};

/// Client for the newline-delimited JSON feed
pub struct TapClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl TapClient {
    /// Connect to the tap server at the given socket path
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .with_context(|| format!("failed to connect to {}", path.display()))?;
        let (read, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read),
            writer,
            line: String::with_capacity(16 * 1024),
        })
    }

    /// Send the subscribe request; must be the first thing sent
    pub async fn subscribe(&mut self, request: &SubscribeRequest) -> Result<()> {
        let line = request.to_line().context("failed to encode subscribe request")?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("failed to send subscribe request")?;
        Ok(())
    }

    /// Receive the next message from the server
    ///
    /// Returns `Ok(None)` if the connection is closed.
    pub async fn recv(&mut self) -> Result<Option<FeedMessage>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("failed to read from socket")?;
            if n == 0 {
                return Ok(None);
            }
            if self.line.trim().is_empty() {
                continue;
            }
            let msg = FeedMessage::from_line(&self.line).context("failed to decode feed message")?;
            return Ok(Some(msg));
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
