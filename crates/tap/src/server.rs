//! Unix socket server for the subscriber feed
//!
//! `TapServer` listens on a Unix socket. Each client sends one
//! `SubscribeRequest` line and then receives newline-delimited
//! `FeedMessage`s:
//!
//! - `all_packets` once, with the buffered history
//! - `new_packets` for every live batch that passes its filter
//! - `capture_started` / `capture_stopped` / `data_cleared` as they happen
//! - `heartbeat` whenever the connection has been quiet for the interval
//! - `error` before closing, when the request is rejected

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TapError};
use crate::protocol::{FeedMessage, SubscribeRequest};
use crate::subscriber::TapItem;
use crate::tap_point::TapPoint;

/// Default socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/sift-tap.sock";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapServerConfig {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Keep-alive interval
    pub heartbeat_interval: Duration,
    /// How long a client may take to send its request line
    pub handshake_timeout: Duration,
}

impl Default for TapServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            heartbeat_interval: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

impl TapServerConfig {
    /// Create config with custom socket path
    pub fn with_socket_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.socket_path = path.as_ref().to_path_buf();
        self
    }
}

/// Unix socket server for the subscriber feed
pub struct TapServer {
    config: TapServerConfig,
    tap_point: Arc<TapPoint>,
}

impl TapServer {
    pub fn new(tap_point: Arc<TapPoint>, config: TapServerConfig) -> Self {
        Self { config, tap_point }
    }

    pub fn with_defaults(tap_point: Arc<TapPoint>) -> Self {
        Self::new(tap_point, TapServerConfig::default())
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Bind the socket, replacing a stale one
    pub fn bind(&self) -> Result<UnixListener> {
        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path)?;
        }
        let listener = UnixListener::bind(&self.config.socket_path)?;
        info!(path = %self.config.socket_path.display(), "tap server listening");
        Ok(listener)
    }

    /// Accept clients until `shutdown` is cancelled, then remove the socket
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener, shutdown).await
    }

    /// Accept clients on an already bound listener
    pub async fn serve(&self, listener: UnixListener, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let tap_point = Arc::clone(&self.tap_point);
                        let config = self.config.clone();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, tap_point, config, shutdown).await {
                                debug!(error = %e, "client connection ended");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }

        if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
            debug!(error = %e, "socket already removed");
        }
        info!("tap server stopped");
        Ok(())
    }

    /// Start the server in a background task
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

async fn send(writer: &mut OwnedWriteHalf, msg: &FeedMessage) -> Result<()> {
    writer.write_all(msg.to_line()?.as_bytes()).await?;
    Ok(())
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    tap_point: Arc<TapPoint>,
    config: TapServerConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let line = match timeout(config.handshake_timeout, lines.next_line()).await {
        Ok(line) => line?,
        Err(_) => {
            send(&mut writer, &FeedMessage::Error {
                message: "no subscribe request received".into(),
            })
            .await?;
            return Err(TapError::Protocol("handshake timed out".into()));
        }
    };
    let Some(line) = line else {
        return Ok(());
    };

    let request = match SubscribeRequest::from_line(&line) {
        Ok(request) => request,
        Err(e) => {
            send(&mut writer, &FeedMessage::Error { message: e.to_string() }).await?;
            return Err(e);
        }
    };

    let subscription = match tap_point.subscribe(&request) {
        Ok(subscription) => subscription,
        Err(e) => {
            send(&mut writer, &FeedMessage::Error { message: e.to_string() }).await?;
            return Err(e);
        }
    };
    let subscriber_id = subscription.id;
    let mut receiver = subscription.receiver;

    info!(
        subscriber_id,
        protocols = ?request.protocols,
        addresses = ?request.addresses,
        history = subscription.history.len(),
        "client subscribed"
    );

    let result = async {
        send(&mut writer, &FeedMessage::AllPackets {
            packets: subscription.history,
        })
        .await?;

        let period = config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                item = receiver.recv() => {
                    let Some(item) = item else { break };
                    let msg = match item {
                        TapItem::Packets(batch) => FeedMessage::NewPackets { packets: batch.to_vec() },
                        TapItem::Event(event) => FeedMessage::from(event),
                    };
                    if let Err(e) = send(&mut writer, &msg).await {
                        warn!(error = %e, subscriber_id, "failed to send to client");
                        break;
                    }
                    heartbeat.reset();
                }
                _ = heartbeat.tick() => {
                    if let Err(e) = send(&mut writer, &FeedMessage::Heartbeat).await {
                        debug!(error = %e, subscriber_id, "failed to send heartbeat");
                        break;
                    }
                }
                line = lines.next_line() => match line {
                    // further client lines are ignored
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => break,
                }
            }
        }
        Ok::<(), TapError>(())
    }
    .await;

    let _ = tap_point.unsubscribe(subscriber_id);
    info!(subscriber_id, "client disconnected");
    result
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
