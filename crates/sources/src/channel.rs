//! In-process capture source fed through a channel
//!
//! `ChannelFactory::new` returns a `PacketInjector` and a factory. Every
//! source the factory opens drains the same feed, so the feed outlives
//! sessions the way a network interface outlives captures on it.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};

use sift_protocol::{DecodedPacket, SourceId};

use crate::common::SourceMetrics;
use crate::error::Result;
use crate::{CaptureSource, Next, SourceFactory};

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;

/// Sending half of a channel feed
#[derive(Debug, Clone)]
pub struct PacketInjector {
    sender: Sender<DecodedPacket>,
}

impl PacketInjector {
    /// Queue a packet, waiting for room if the feed is bounded and full
    ///
    /// Returns false once every receiver is gone.
    pub fn inject(&self, packet: DecodedPacket) -> bool {
        self.sender.send(packet).is_ok()
    }

    /// Queue a packet without waiting; returns false if full or closed
    pub fn try_inject(&self, packet: DecodedPacket) -> bool {
        match self.sender.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }

    /// Packets queued but not yet read
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

/// Opens sources that read from a shared channel feed
#[derive(Debug, Clone)]
pub struct ChannelFactory {
    receiver: Receiver<DecodedPacket>,
    metrics: Arc<SourceMetrics>,
}

impl ChannelFactory {
    /// Create a feed; `capacity` of `None` means unbounded
    pub fn new(capacity: Option<usize>) -> (PacketInjector, Self) {
        let (sender, receiver) = match capacity {
            Some(cap) => channel::bounded(cap),
            None => channel::unbounded(),
        };
        (
            PacketInjector { sender },
            Self {
                receiver,
                metrics: Arc::new(SourceMetrics::new()),
            },
        )
    }

    /// Metrics shared by every source this factory opened
    pub fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }
}

impl SourceFactory for ChannelFactory {
    fn open(&self, source: &SourceId, _filter: &str) -> Result<Box<dyn CaptureSource>> {
        self.metrics.source_opened();
        Ok(Box::new(ChannelSource {
            id: source.clone(),
            receiver: self.receiver.clone(),
            metrics: Arc::clone(&self.metrics),
        }))
    }

    fn filters_natively(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// A source reading from a channel feed
#[derive(Debug)]
pub struct ChannelSource {
    id: SourceId,
    receiver: Receiver<DecodedPacket>,
    metrics: Arc<SourceMetrics>,
}

impl CaptureSource for ChannelSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn next_packet(&mut self, timeout: Duration) -> Result<Next> {
        match self.receiver.recv_timeout(timeout) {
            Ok(packet) => {
                self.metrics.packet_read(packet.length.unwrap_or(0));
                Ok(Next::Packet(packet))
            }
            Err(RecvTimeoutError::Timeout) => Ok(Next::Idle),
            Err(RecvTimeoutError::Disconnected) => Ok(Next::End),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.metrics.source_closed();
        Ok(())
    }

    fn filters_natively(&self) -> bool {
        false
    }
}
