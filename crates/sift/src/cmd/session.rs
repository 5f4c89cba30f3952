//! Shared session runner for `capture` and `replay`
//!
//! Builds the pipeline from configuration, starts the session, then hands
//! control to either the scrolling view or the plain line printer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sift_classify::{Classifier, ClassifierConfig};
use sift_config::{Config, ExportFormat as ConfigExportFormat, Overflow};
use sift_pipeline::{
    ExitReason, FanOutSettings, OverflowPolicy, Pipeline, PipelineBuilder, PipelineSettings,
    SessionSettings, SessionState, WorkerSettings,
};
use sift_protocol::{Consumer, SourceId};
use sift_sinks::{
    ExportConfig, ExportFormat, ScrollBuffer, SnapshotConfig, StdoutConfig, StdoutSink,
    DEFAULT_SCROLL_CAPACITY,
};
use sift_sources::SourceFactory;

use crate::tui::App;

/// How often plain mode checks whether the session ended on its own
const PLAIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Options common to every capturing command
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Display filter (overrides [capture] filter)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print plain lines to stdout instead of the scrolling view
    #[arg(long)]
    pub plain: bool,

    /// Disable colored output in plain mode
    #[arg(long)]
    pub no_color: bool,

    /// Serve the subscriber feed (overrides [tap] enabled)
    #[arg(long)]
    pub tap: bool,

    /// Subscriber feed socket path (overrides [tap] socket_path)
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Directory for snapshot files (overrides [snapshot] dir)
    #[arg(long, value_name = "DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Do not write snapshot files
    #[arg(long, conflicts_with = "snapshot_dir")]
    pub no_snapshot: bool,

    /// Directory for exports (overrides [export] dir)
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

impl SessionArgs {
    /// Fold command line overrides into `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref filter) = self.filter {
            config.capture.filter = filter.clone();
        }
        if self.tap {
            config.tap.enabled = true;
        }
        if let Some(ref socket) = self.socket {
            config.tap.enabled = true;
            config.tap.socket_path = socket.clone();
        }
        if let Some(ref dir) = self.snapshot_dir {
            config.snapshot.dir = dir.clone();
        }
        if self.no_snapshot {
            config.snapshot.enabled = false;
        }
        if let Some(ref dir) = self.export_dir {
            config.export.dir = dir.clone();
        }
    }
}

/// Pipeline settings from the `[channel]`, `[worker]`, `[fanout]`,
/// `[capture]` and `[snapshot]` sections
pub fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings {
        channel_capacity: config.channel.bound(),
        overflow: match config.channel.overflow {
            Overflow::Block => OverflowPolicy::Block,
            Overflow::DropNewest => OverflowPolicy::DropNewest,
        },
        session: SessionSettings {
            worker: WorkerSettings {
                poll_interval: config.capture.poll_interval,
                flush_every: config.snapshot.flush_every,
            },
            stop_timeout: config.worker.stop_timeout,
            drain_on_restart: config.worker.drain_on_restart,
        },
        fanout: FanOutSettings {
            batch_size: config.fanout.batch_size,
            busy_threshold: config.fanout.busy_threshold,
            busy_delay: config.fanout.busy_delay,
            partial_delay: config.fanout.partial_delay,
            idle_delay: config.fanout.idle_delay,
        },
        max_records: config.snapshot.max_records,
    }
}

pub fn classifier(config: &Config) -> Classifier {
    let mut classifier_config = ClassifierConfig::default();
    if config.classify.latency_probe {
        classifier_config = classifier_config.with_latency_probe(config.classify.probe_port);
    }
    Classifier::new(&classifier_config)
}

pub fn export_format(format: ConfigExportFormat) -> ExportFormat {
    match format {
        ConfigExportFormat::Csv => ExportFormat::Csv,
        ConfigExportFormat::Json => ExportFormat::Json,
        ConfigExportFormat::Both => ExportFormat::Both,
    }
}

pub fn export_config(config: &Config) -> ExportConfig {
    ExportConfig {
        dir: config.export.dir.clone(),
        prefix: config.export.prefix.clone(),
        format: export_format(config.export.format),
    }
}

pub fn snapshot_config(config: &Config) -> Option<SnapshotConfig> {
    config
        .snapshot
        .enabled
        .then(|| SnapshotConfig::in_dir(&config.snapshot.dir))
}

/// Run one capture session against `source` until the user quits or, in
/// plain mode, until the source ends
pub async fn run(
    factory: Arc<dyn SourceFactory>,
    source: SourceId,
    args: SessionArgs,
    mut config: Config,
) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        adapter = factory.name(),
        source = %source,
        filter = %config.capture.filter,
        "sift starting"
    );

    let shutdown = CancellationToken::new();
    let _cancel_on_exit = shutdown.clone().drop_guard();

    let mut builder = PipelineBuilder::new(factory)
        .classifier(classifier(&config))
        .settings(pipeline_settings(&config))
        .export(export_config(&config));
    if let Some(snapshot) = snapshot_config(&config) {
        builder = builder.snapshot(snapshot);
    }

    let scroll = Arc::new(ScrollBuffer::new(DEFAULT_SCROLL_CAPACITY));
    if args.plain {
        let color = !args.no_color && atty::is(atty::Stream::Stdout);
        let stdout_config = if color {
            StdoutConfig::default()
        } else {
            StdoutConfig::no_color()
        };
        builder = builder.consumer(Arc::new(StdoutSink::with_config(stdout_config)));
    } else {
        builder = builder.consumer(Arc::clone(&scroll) as Arc<dyn Consumer>);
    }

    #[cfg(unix)]
    let tap_tasks = if config.tap.enabled {
        let (tap_point, tasks) = spawn_tap(&config, &shutdown);
        builder = builder.consumer(tap_point);
        Some(tasks)
    } else {
        None
    };

    let mut pipeline = builder.build().context("failed to build pipeline")?;
    pipeline
        .control_mut()
        .start(source.clone(), &config.capture.filter)
        .with_context(|| format!("failed to start capture on {source}"))?;

    let outcome = if args.plain {
        run_plain(&mut pipeline).await
    } else {
        App::new(pipeline_view(&config, scroll))?
            .run(&mut pipeline)
            .await
    };

    // Stopping waits for the worker; keep it off the async workers
    let metrics = tokio::task::block_in_place(move || {
        let metrics = Arc::clone(pipeline.control().metrics());
        pipeline.shutdown();
        metrics.snapshot()
    });
    shutdown.cancel();

    #[cfg(unix)]
    if let Some(tasks) = tap_tasks {
        tasks.join().await;
    }

    info!(
        seen = metrics.packets_seen,
        classified = metrics.records_classified,
        dropped = metrics.records_dropped,
        "sift stopped"
    );
    outcome
}

fn pipeline_view(config: &Config, scroll: Arc<ScrollBuffer>) -> crate::tui::ViewConfig {
    crate::tui::ViewConfig {
        scroll,
        export_format: export_format(config.export.format),
        tap_socket: config
            .tap
            .enabled
            .then(|| config.tap.socket_path.display().to_string()),
    }
}

/// Wait for Ctrl+C or for the source to end
async fn run_plain(pipeline: &mut Pipeline) -> Result<()> {
    let mut ticker = tokio::time::interval(PLAIN_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                return Ok(());
            }
            _ = ticker.tick() => {
                let status = pipeline.control_mut().status();
                if status.state == SessionState::Idle {
                    match &status.last_exit {
                        Some(ExitReason::SourceError(msg)) => {
                            warn!(error = %msg, "capture ended with an error");
                            anyhow::bail!("capture source failed: {msg}");
                        }
                        reason => {
                            info!(
                                records = status.record_count,
                                reason = ?reason,
                                "capture finished"
                            );
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
struct TapTasks {
    server: tokio::task::JoinHandle<sift_tap::Result<()>>,
    maintenance: tokio::task::JoinHandle<()>,
}

#[cfg(unix)]
impl TapTasks {
    async fn join(self) {
        match self.server.await {
            Ok(Err(e)) => warn!(error = %e, "tap server failed"),
            Err(e) => warn!(error = %e, "tap server task aborted"),
            Ok(Ok(())) => {}
        }
        let _ = self.maintenance.await;
    }
}

#[cfg(unix)]
fn spawn_tap(
    config: &Config,
    shutdown: &CancellationToken,
) -> (Arc<dyn Consumer>, TapTasks) {
    use sift_tap::{SubscriberManager, TapPoint, TapServer, TapServerConfig};

    let subscribers = SubscriberManager::with_limits(
        config.tap.max_subscribers,
        config.tap.subscriber_buffer,
    );
    let tap_point = Arc::new(TapPoint::with_subscribers(
        config.tap.replay_capacity,
        subscribers,
    ));
    let maintenance = tap_point.spawn_maintenance(shutdown.clone());

    let server_config = TapServerConfig {
        socket_path: config.tap.socket_path.clone(),
        heartbeat_interval: config.tap.heartbeat_interval,
        ..TapServerConfig::default()
    };
    let server = TapServer::new(Arc::clone(&tap_point), server_config).spawn(shutdown.clone());

    (tap_point, TapTasks { server, maintenance })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
