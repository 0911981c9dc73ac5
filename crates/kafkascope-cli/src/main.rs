//! kscope
//!
//! Offline dissector for captured Apache Kafka traffic.
//!
//! ## Quick Start
//!
//! ```bash
//! # Decode a JSON-lines capture, one TCP payload per line
//! kscope capture session.jsonl
//!
//! # Decode two one-direction stream dumps (e.g. from tcpflow)
//! kscope streams --client 010.000.000.001.51234-010.000.000.002.09092 \
//!                --server 010.000.000.002.09092-010.000.000.001.51234
//!
//! # Machine-readable output
//! kscope --format json capture session.jsonl
//! ```
//!
//! ## Configuration
//!
//! `~/.kafkascope/config.toml`, or the file named by `--config` /
//! `KSCOPE_CONFIG`:
//!
//! ```toml
//! [decoder]
//! max_frame_size = 104857600
//! max_nesting_depth = 8
//! verify_checksums = true
//!
//! [output]
//! format = "text"
//! colored = true
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use kafkascope_kafka::{ConnectionKey, Dissector};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

mod capture;
mod config;
mod format;

use capture::Segment;
use config::{Config, OutputFormat};
use format::{Formatter, Summary};

#[derive(Parser)]
#[command(name = "kscope")]
#[command(about = "Decode captured Kafka protocol traffic", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "KSCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format, overrides the config file
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Skip CRC verification of record batches
    #[arg(long)]
    no_verify: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a JSON-lines file of captured segments
    Capture {
        /// Capture file, one {"connection","direction","frame","data"} object per line
        file: PathBuf,
    },
    /// Decode raw client and server stream dumps of one connection
    Streams {
        /// Client-to-broker bytes
        #[arg(long)]
        client: PathBuf,
        /// Broker-to-client bytes
        #[arg(long)]
        server: PathBuf,
        /// Name shown for the connection
        #[arg(long, default_value = "client->broker")]
        connection: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if cli.no_color {
        config.output.colored = false;
    }
    if cli.no_verify {
        config.decoder.verify_checksums = false;
    }
    debug!(?config, "configuration loaded");

    let segments = match &cli.command {
        Commands::Capture { file } => capture::read_capture(file)?,
        Commands::Streams {
            client,
            server,
            connection,
        } => capture::read_streams(connection, client, server)?,
    };
    info!(segments = segments.len(), "decoding capture");

    let formatter = Formatter::new(config.output.format, config.output.colored);
    let mut dissector = Dissector::new(config.decoder);
    let summary = dissect(&mut dissector, &segments, &formatter)?;
    formatter.print_summary(&summary);

    Ok(())
}

/// Feed every segment in order and print what comes out.
fn dissect(dissector: &mut Dissector, segments: &[Segment], formatter: &Formatter) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut connections: BTreeSet<ConnectionKey> = BTreeSet::new();

    for segment in segments {
        connections.insert(segment.connection.clone());
        let outcome = dissector.feed(
            &segment.connection,
            segment.direction,
            segment.frame,
            &segment.data,
        );
        formatter.print_stream_diagnostics(&segment.connection, segment.direction, &outcome.diagnostics)?;
        for message in &outcome.messages {
            summary.messages += 1;
            if !message.diagnostics.is_empty() {
                summary.with_diagnostics += 1;
            }
            formatter.print_message(message)?;
        }
    }

    summary.unmatched_requests = connections.iter().map(|c| dissector.pending(c)).sum();
    Ok(summary)
}
