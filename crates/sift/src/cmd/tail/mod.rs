//! Tail command - follow a running session's subscriber feed
//!
//! Connects to the tap socket, prints the replayed history and then every
//! new batch as it is distributed.

mod client;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing_subscriber::EnvFilter;

use sift_config::Config;
use sift_protocol::{Consumer, PacketRecord, SessionEvent};
use sift_sinks::{StdoutConfig, StdoutSink};
use sift_tap::{FeedMessage, SubscribeRequest};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned, colored lines
    #[default]
    Text,
    /// One JSON object per record or event
    Json,
}

/// Tail command arguments
#[derive(Args, Debug)]
pub struct TailArgs {
    /// Socket path to connect to (defaults to [tap] socket_path)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Only records with this protocol tag (can be repeated)
    #[arg(short, long = "protocol", value_name = "TAG")]
    protocols: Vec<String>,

    /// Only records to or from this address (can be repeated)
    #[arg(short, long = "address", value_name = "ADDR")]
    addresses: Vec<String>,

    /// Replay at most N buffered records on connect
    #[arg(long = "last", value_name = "N")]
    last_n: Option<usize>,

    /// Sample rate (0.0 - 1.0, e.g., 0.1 = 10% of batches)
    #[arg(long, value_name = "RATE")]
    sample: Option<f32>,

    /// Max batches per second
    #[arg(long = "rate-limit", value_name = "N")]
    rate_limit: Option<u32>,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose output (show heartbeats)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress connection messages)
    #[arg(short, long)]
    quiet: bool,
}

impl TailArgs {
    fn request(&self) -> SubscribeRequest {
        let mut request = SubscribeRequest::new();
        if !self.protocols.is_empty() {
            request = request.with_protocols(self.protocols.iter().cloned());
        }
        if !self.addresses.is_empty() {
            request = request.with_addresses(self.addresses.iter().cloned());
        }
        if let Some(n) = self.last_n {
            request = request.with_last_n(n);
        }
        if let Some(rate) = self.sample {
            request = request.with_sample_rate(rate);
        }
        if let Some(limit) = self.rate_limit {
            request = request.with_rate_limit(limit);
        }
        request
    }
}

/// Run the tail command
pub async fn run(args: TailArgs, config: Config) -> Result<()> {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else if args.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .init();

    let socket = args.socket.clone().unwrap_or(config.tap.socket_path);
    let use_color = atty::is(atty::Stream::Stdout) && !args.no_color;
    let printer = Printer::new(args.format, use_color);

    tracing::info!(socket = %socket.display(), "connecting to session");
    let mut client = client::TapClient::connect(&socket).await?;
    client.subscribe(&args.request()).await?;
    tracing::info!("streaming records (Ctrl+C to stop)");

    loop {
        tokio::select! {
            result = client.recv() => {
                match result {
                    Ok(Some(FeedMessage::Heartbeat)) => {
                        tracing::debug!("heartbeat");
                    }
                    Ok(Some(FeedMessage::Error { message })) => {
                        anyhow::bail!("server rejected subscription: {message}");
                    }
                    Ok(Some(msg)) => printer.print(msg)?,
                    Ok(None) => {
                        tracing::info!("connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "receive error");
                        return Err(e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Writes feed messages to stdout in the chosen format
struct Printer {
    format: Format,
    lines: StdoutSink,
}

impl Printer {
    fn new(format: Format, color: bool) -> Self {
        let config = if color {
            StdoutConfig::default()
        } else {
            StdoutConfig::no_color()
        };
        Self {
            format,
            lines: StdoutSink::with_config(config),
        }
    }

    fn print(&self, msg: FeedMessage) -> Result<()> {
        match (self.format, msg) {
            (Format::Json, FeedMessage::AllPackets { packets })
            | (Format::Json, FeedMessage::NewPackets { packets }) => print_json(&packets),
            (Format::Json, other) => {
                let mut out = io::stdout().lock();
                out.write_all(other.to_line()?.as_bytes())?;
                Ok(())
            }
            (Format::Text, FeedMessage::AllPackets { packets })
            | (Format::Text, FeedMessage::NewPackets { packets }) => {
                let batch: Arc<[PacketRecord]> = packets.into();
                self.lines.deliver(&batch)?;
                Ok(())
            }
            (Format::Text, other) => {
                if let Some(event) = session_event(&other) {
                    self.lines.notify(event)?;
                }
                Ok(())
            }
        }
    }
}

fn print_json(records: &[PacketRecord]) -> Result<()> {
    let mut out = io::stdout().lock();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn session_event(msg: &FeedMessage) -> Option<SessionEvent> {
    match msg {
        FeedMessage::CaptureStarted => Some(SessionEvent::CaptureStarted),
        FeedMessage::CaptureStopped => Some(SessionEvent::CaptureStopped),
        FeedMessage::DataCleared => Some(SessionEvent::DataCleared),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: TailArgs,
    }

    fn parse(argv: &[&str]) -> TailArgs {
        let mut full = vec!["tail"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_default_request_subscribes_to_everything() {
        assert_eq!(parse(&[]).request(), SubscribeRequest::new());
    }

    #[test]
    fn test_request_from_flags() {
        let args = parse(&[
            "-p", "dns", "-p", "TCP", "-a", "10.0.0.1", "--last", "20", "--sample", "2.0",
            "--rate-limit", "5",
        ]);
        let request = args.request();

        assert_eq!(
            request.protocols,
            Some(vec!["dns".to_string(), "TCP".to_string()])
        );
        assert_eq!(request.addresses, Some(vec!["10.0.0.1".to_string()]));
        assert_eq!(request.last_n, Some(20));
        assert_eq!(request.sample_rate, Some(1.0));
        assert_eq!(request.max_batches_per_sec, Some(5));
    }

    #[test]
    fn test_output_format_flag() {
        assert_eq!(parse(&[]).format, Format::Text);
        assert_eq!(parse(&["-o", "json"]).format, Format::Json);
        assert!(Harness::try_parse_from(["tail", "-o", "xml"]).is_err());
    }

    #[test]
    fn test_session_event_mapping() {
        assert_eq!(
            session_event(&FeedMessage::DataCleared),
            Some(SessionEvent::DataCleared)
        );
        assert_eq!(session_event(&FeedMessage::Heartbeat), None);
    }
}
