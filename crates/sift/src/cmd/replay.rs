//! Replay command - feed a previously captured EK JSON file

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;

use sift_config::Config;
use sift_sources::{ReplayConfig, ReplayFactory};

use super::session::{self, SessionArgs};

/// Replay command arguments
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Newline-delimited EK JSON file (`tshark -T ek` output)
    pub file: PathBuf,

    /// Pace packets by their capture timestamps (overrides [capture] realtime_replay)
    #[arg(long)]
    pub realtime: bool,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Run the replay command
pub async fn run(args: ReplayArgs, config: Config) -> Result<()> {
    if !args.file.is_file() {
        bail!("replay file not found: {}", args.file.display());
    }

    let factory = ReplayFactory::new(ReplayConfig {
        realtime: args.realtime || config.capture.realtime_replay,
        max_gap: config.capture.max_replay_gap,
    });
    let source = args.file.display().to_string();

    session::run(Arc::new(factory), source.into(), args.session, config).await
}
