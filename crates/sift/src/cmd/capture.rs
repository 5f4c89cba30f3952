//! Capture command - live traffic through the external dissector

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use sift_config::Config;
use sift_sources::{TsharkConfig, TsharkFactory};

use super::session::{self, SessionArgs};

/// Capture command arguments
#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Interface to capture on (defaults to [capture] interface)
    #[arg(short, long)]
    pub interface: Option<String>,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Dissector settings from the `[capture]` section
pub fn tshark_config(config: &Config) -> TsharkConfig {
    TsharkConfig {
        program: config.capture.program.clone(),
        extra_args: config.capture.extra_args.clone(),
        channel_capacity: config.capture.reader_capacity,
        include_raw: config.capture.include_raw,
    }
}

/// Run the capture command
pub async fn run(args: CaptureArgs, config: Config) -> Result<()> {
    let interface = args
        .interface
        .or_else(|| config.capture.interface.clone())
        .context("no interface given: pass -i <interface> or set [capture] interface")?;

    let factory = TsharkFactory::new(tshark_config(&config));
    session::run(Arc::new(factory), interface.into(), args.session, config).await
}
