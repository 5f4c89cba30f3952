//! Pipeline assembly
//!
//! Wires the long-lived parts together: one distribution channel, one
//! consumer registry with its fan-out thread, the shared accumulation and
//! the control plane that runs sessions over them.

use std::sync::Arc;

use sift_classify::Classifier;
use sift_protocol::Consumer;
use sift_sinks::{
    Accumulation, ExportConfig, SharedAccumulation, SnapshotConfig, SnapshotStore,
};
use sift_sources::SourceFactory;
use tracing::info;

use crate::channel::{DistributionChannel, OverflowPolicy};
use crate::control::{ControlParts, ControlPlane, SessionSettings};
use crate::error::Result;
use crate::fanout::{ConsumerSet, FanOut, FanOutSettings};

/// Default distribution channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Settings for a whole pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// `None` = unbounded
    pub channel_capacity: Option<usize>,
    pub overflow: OverflowPolicy,
    pub session: SessionSettings,
    pub fanout: FanOutSettings,
    /// Accumulation retention; 0 = unbounded
    pub max_records: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: Some(DEFAULT_CHANNEL_CAPACITY),
            overflow: OverflowPolicy::default(),
            session: SessionSettings::default(),
            fanout: FanOutSettings::default(),
            max_records: 0,
        }
    }
}

/// Builds a [`Pipeline`]
pub struct PipelineBuilder {
    factory: Arc<dyn SourceFactory>,
    classifier: Classifier,
    settings: PipelineSettings,
    snapshot: Option<SnapshotConfig>,
    export: ExportConfig,
    consumers: Vec<Arc<dyn Consumer>>,
}

impl PipelineBuilder {
    pub fn new(factory: Arc<dyn SourceFactory>) -> Self {
        Self {
            factory,
            classifier: Classifier::default(),
            settings: PipelineSettings::default(),
            snapshot: None,
            export: ExportConfig::default(),
            consumers: Vec::new(),
        }
    }

    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Write snapshot artifacts as the session accumulates
    pub fn snapshot(mut self, config: SnapshotConfig) -> Self {
        self.snapshot = Some(config);
        self
    }

    pub fn export(mut self, config: ExportConfig) -> Self {
        self.export = config;
        self
    }

    /// Register a consumer before the fan-out starts
    pub fn consumer(mut self, consumer: Arc<dyn Consumer>) -> Self {
        self.consumers.push(consumer);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let store = self
            .snapshot
            .as_ref()
            .map(SnapshotStore::open)
            .transpose()?
            .map(Arc::new);

        let channel = Arc::new(DistributionChannel::new(
            self.settings.channel_capacity,
            self.settings.overflow,
        ));
        let consumers = Arc::new(ConsumerSet::new());
        for consumer in self.consumers {
            consumers.register(consumer);
        }
        let accumulation = Accumulation::shared(self.settings.max_records);

        let fanout = FanOut::spawn(
            Arc::clone(&channel),
            Arc::clone(&consumers),
            self.settings.fanout,
        )?;

        info!(
            adapter = self.factory.name(),
            capacity = ?self.settings.channel_capacity,
            overflow = %self.settings.overflow,
            consumers = consumers.len(),
            "pipeline ready"
        );

        let control = ControlPlane::new(ControlParts {
            factory: self.factory,
            classifier: Arc::new(self.classifier),
            channel: Arc::clone(&channel),
            consumers: Arc::clone(&consumers),
            accumulation: Arc::clone(&accumulation),
            store,
            export: self.export,
            settings: self.settings.session,
        });

        Ok(Pipeline {
            control,
            fanout: Some(fanout),
            consumers,
            channel,
            accumulation,
        })
    }
}

/// A running pipeline: control plane plus fan-out
///
/// Dropping it stops any session and then the fan-out, in that order.
pub struct Pipeline {
    control: ControlPlane,
    fanout: Option<FanOut>,
    consumers: Arc<ConsumerSet>,
    channel: Arc<DistributionChannel>,
    accumulation: SharedAccumulation,
}

impl Pipeline {
    pub fn control(&self) -> &ControlPlane {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut ControlPlane {
        &mut self.control
    }

    pub fn consumers(&self) -> &Arc<ConsumerSet> {
        &self.consumers
    }

    pub fn channel(&self) -> &Arc<DistributionChannel> {
        &self.channel
    }

    pub fn accumulation(&self) -> &SharedAccumulation {
        &self.accumulation
    }

    /// Stop the session if any, deliver what is queued, stop the fan-out
    pub fn shutdown(mut self) {
        if self.control.is_running() {
            let _ = self.control.stop();
        }
        if let Some(fanout) = self.fanout.take() {
            fanout.shutdown();
        }
    }
}
