//! Ingestion worker tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use sift_classify::{Classifier, ClassifierConfig, DisplayFilter};
use sift_protocol::{DecodedPacket, Layer, SourceId};
use sift_sinks::{Accumulation, SharedAccumulation, SnapshotConfig, SnapshotStore, load_records};
use sift_sources::{CaptureSource, ChannelFactory, Next, SourceError, SourceFactory};

use super::{ExitReason, WorkerContext, WorkerSettings, spawn};
use crate::channel::{DistributionChannel, OverflowPolicy};
use crate::metrics::{BackpressureTracker, PipelineMetrics};

const WAIT: Duration = Duration::from_secs(5);

fn udp_packet(src: &str, len: u64) -> DecodedPacket {
    DecodedPacket::new(Utc::now())
        .with_length(len)
        .with_layer(Layer::new("eth"))
        .with_layer(Layer::new("ip").with("src", src).with("dst", "10.0.0.2"))
        .with_layer(
            Layer::new("udp")
                .with("srcport", "5000")
                .with("dstport", "6000")
                .with("length", "20"),
        )
}

/// Source scripted from a list of steps, counting closes
struct ScriptedSource {
    id: SourceId,
    steps: Vec<Step>,
    closes: Arc<AtomicUsize>,
}

enum Step {
    Packet(DecodedPacket),
    Fail,
    Panic,
}

impl CaptureSource for ScriptedSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn next_packet(&mut self, _timeout: Duration) -> sift_sources::Result<Next> {
        if self.steps.is_empty() {
            return Ok(Next::End);
        }
        match self.steps.remove(0) {
            Step::Packet(packet) => Ok(Next::Packet(packet)),
            Step::Fail => Err(SourceError::Exited("interface went down".into())),
            Step::Panic => panic!("dissector crashed"),
        }
    }

    fn close(&mut self) -> sift_sources::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn filters_natively(&self) -> bool {
        false
    }
}

struct Harness {
    channel: Arc<DistributionChannel>,
    accumulation: SharedAccumulation,
    metrics: Arc<PipelineMetrics>,
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
}

impl Harness {
    fn new() -> Self {
        Self {
            channel: Arc::new(DistributionChannel::new(Some(100), OverflowPolicy::DropNewest)),
            accumulation: Accumulation::shared(0),
            metrics: Arc::new(PipelineMetrics::new()),
            cancel: CancellationToken::new(),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    fn context(
        &self,
        source: Box<dyn CaptureSource>,
        filter: Option<DisplayFilter>,
        store: Option<Arc<SnapshotStore>>,
    ) -> WorkerContext {
        WorkerContext {
            source,
            filter,
            classifier: Arc::new(Classifier::new(&ClassifierConfig::default())),
            channel: Arc::clone(&self.channel),
            accumulation: Arc::clone(&self.accumulation),
            store,
            cancel: self.cancel.clone(),
            paused: Arc::clone(&self.paused),
            metrics: Arc::clone(&self.metrics),
            backpressure: Arc::new(BackpressureTracker::new()),
            settings: WorkerSettings {
                poll_interval: Duration::from_millis(20),
                flush_every: 10,
            },
        }
    }
}

fn scripted(steps: Vec<Step>) -> (Box<dyn CaptureSource>, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let source = ScriptedSource {
        id: SourceId::new("scripted"),
        steps,
        closes: Arc::clone(&closes),
    };
    (Box::new(source), closes)
}

// ============================================================================
// Exit paths
// ============================================================================

#[test]
fn test_end_of_source_flushes_and_closes_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SnapshotStore::open(&SnapshotConfig::in_dir(dir.path())).unwrap());
    let harness = Harness::new();

    let steps = (0..3).map(|i| Step::Packet(udp_packet("10.0.0.1", 60 + i))).collect();
    let (source, closes) = scripted(steps);

    let handle = spawn(harness.context(source, None, Some(Arc::clone(&store)))).unwrap();
    assert_eq!(handle.wait(WAIT), Some(ExitReason::EndOfSource));

    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.channel.len(), 3);
    assert_eq!(harness.accumulation.read().len(), 3);

    // fewer than flush_every records, so only the final flush wrote them
    let flushed = load_records(store.packets_path()).unwrap();
    assert_eq!(flushed, harness.accumulation.read().to_vec());
    assert_eq!(harness.metrics.snapshot().flushes, 1);
}

#[test]
fn test_periodic_flush_every_n_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SnapshotStore::open(&SnapshotConfig::in_dir(dir.path())).unwrap());
    let harness = Harness::new();

    let steps = (0..25).map(|i| Step::Packet(udp_packet("10.0.0.1", 60 + i))).collect();
    let (source, _) = scripted(steps);

    let handle = spawn(harness.context(source, None, Some(store))).unwrap();
    assert_eq!(handle.wait(WAIT), Some(ExitReason::EndOfSource));

    // two periodic flushes (10, 20) plus the final one
    assert_eq!(harness.metrics.snapshot().flushes, 3);
}

#[test]
fn test_source_error_ends_session() {
    let harness = Harness::new();
    let (source, closes) = scripted(vec![Step::Packet(udp_packet("10.0.0.1", 60)), Step::Fail]);

    let handle = spawn(harness.context(source, None, None)).unwrap();
    assert_eq!(
        handle.wait(WAIT),
        Some(ExitReason::SourceError(
            "capture process exited: interface went down".into()
        ))
    );
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.accumulation.read().len(), 1);
}

#[test]
fn test_panic_still_closes_source() {
    let harness = Harness::new();
    let (source, closes) = scripted(vec![Step::Packet(udp_packet("10.0.0.1", 60)), Step::Panic]);

    let handle = spawn(harness.context(source, None, None)).unwrap();
    assert_eq!(handle.wait(WAIT), Some(ExitReason::Panicked));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stop_while_source_is_quiet() {
    let harness = Harness::new();
    let (_injector, factory) = ChannelFactory::new(None);
    let source = factory.open(&SourceId::new("feed"), "").unwrap();

    let handle = spawn(harness.context(source, None, None)).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());

    harness.cancel.cancel();
    assert_eq!(handle.wait(Duration::from_secs(1)), Some(ExitReason::Stopped));
    assert_eq!(factory.metrics().snapshot().closed, 1);
}

// ============================================================================
// Per-packet handling
// ============================================================================

#[test]
fn test_pause_discards_but_keeps_consuming() {
    let harness = Harness::new();
    harness.paused.store(true, Ordering::Release);

    let steps = (0..5).map(|i| Step::Packet(udp_packet("10.0.0.1", 60 + i))).collect();
    let (source, _) = scripted(steps);

    let handle = spawn(harness.context(source, None, None)).unwrap();
    assert_eq!(handle.wait(WAIT), Some(ExitReason::EndOfSource));

    assert!(harness.accumulation.read().is_empty());
    assert!(harness.channel.is_empty());
    let metrics = harness.metrics.snapshot();
    assert_eq!(metrics.packets_seen, 5);
    assert_eq!(metrics.packets_paused, 5);
}

#[test]
fn test_worker_side_filter() {
    let harness = Harness::new();
    let filter = DisplayFilter::parse("ip.src == 10.0.0.7").unwrap();

    let steps = vec![
        Step::Packet(udp_packet("10.0.0.1", 60)),
        Step::Packet(udp_packet("10.0.0.7", 61)),
        Step::Packet(udp_packet("10.0.0.9", 62)),
    ];
    let (source, _) = scripted(steps);

    let handle = spawn(harness.context(source, Some(filter), None)).unwrap();
    handle.wait(WAIT).unwrap();

    let records = harness.accumulation.read().to_vec();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_addr, "10.0.0.7");
    assert_eq!(harness.metrics.snapshot().packets_filtered, 2);
}

#[test]
fn test_packet_without_length_is_skipped() {
    let harness = Harness::new();
    let no_length = DecodedPacket::new(Utc::now()).with_layer(Layer::new("arp"));
    let (source, _) = scripted(vec![
        Step::Packet(no_length),
        Step::Packet(udp_packet("10.0.0.1", 60)),
    ]);

    let handle = spawn(harness.context(source, None, None)).unwrap();
    handle.wait(WAIT).unwrap();

    assert_eq!(harness.accumulation.read().appended(), 1);
    assert_eq!(harness.metrics.snapshot().packets_skipped, 1);
}

#[test]
fn test_full_channel_drops_but_accumulates() {
    let harness = Harness {
        channel: Arc::new(DistributionChannel::new(Some(2), OverflowPolicy::DropNewest)),
        ..Harness::new()
    };
    let steps = (0..5).map(|i| Step::Packet(udp_packet("10.0.0.1", 60 + i))).collect();
    let (source, _) = scripted(steps);

    let handle = spawn(harness.context(source, None, None)).unwrap();
    handle.wait(WAIT).unwrap();

    assert_eq!(harness.channel.len(), 2);
    assert_eq!(harness.accumulation.read().len(), 5);
    assert_eq!(harness.metrics.records_dropped(), 3);
}
