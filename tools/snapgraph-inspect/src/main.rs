// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! snapgraph-inspect - Inspect binding tables and snapshot files.
//!
//! Usage:
//!   snapgraph-inspect bindings
//!   snapgraph-inspect bindings --config codecs.yaml --json
//!   snapgraph-inspect verify cache/graph.snap --config codecs.yaml

use anyhow::Context;
use clap::{Parser, Subcommand};
use snapgraph::{verify, CodecConfig, CodecRegistry, ManagedFactoryRegistry};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "snapgraph-inspect")]
#[command(about = "Inspect snapgraph binding tables and snapshot files")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the binding table in tag order
    Bindings {
        /// Codec config (.yaml, .yml or .json); built-in defaults if omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check a snapshot file's header and checksum
    Verify {
        /// Snapshot file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Codec config to compare the stream signature against
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = cli.log_level.parse().unwrap_or(tracing::Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Bindings { config, json } => cmd_bindings(config.as_deref(), json),
        Commands::Verify { input, config } => cmd_verify(&input, config.as_deref()),
    }
}

fn build_registry(config: Option<&Path>) -> anyhow::Result<CodecRegistry> {
    let config = match config {
        Some(path) => CodecConfig::load(path)
            .with_context(|| format!("loading codec config {}", path.display()))?,
        None => CodecConfig::default(),
    };
    debug!(
        unsupported = config.unsupported.len(),
        owner_services = config.owner_services.len(),
        "building registry"
    );
    Ok(CodecRegistry::standard(&config, Arc::new(ManagedFactoryRegistry::new()))?)
}

fn cmd_bindings(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let registry = build_registry(config)?;
    let rows = registry.describe();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let width = rows.iter().map(|r| r.matcher.len()).max().unwrap_or(0);
    println!("{:>4}  {:<width$}  CODEC", "TAG", "MATCHER");
    for row in &rows {
        println!("{:>4}  {:<width$}  {}", row.tag, row.matcher, row.codec);
    }
    println!();
    println!("signature: {}", registry.signature_hex());
    Ok(())
}

fn cmd_verify(input: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let summary = verify(&mut BufReader::new(file))
        .with_context(|| format!("verifying {}", input.display()))?;

    let signature: String = summary.header.signature.iter().map(|b| format!("{b:02x}")).collect();
    println!("[OK] {}", input.display());
    println!("  version:   {}", summary.header.version);
    println!("  signature: {signature}");
    println!("  roots:     {}", summary.roots);
    println!("  body:      {} bytes (crc32 {:#010x})", summary.body_len, summary.checksum);

    let registry = build_registry(config)?;
    if registry.signature() == summary.header.signature {
        println!("  registry:  matches");
    } else {
        warn!("stream was written with a different binding table");
        println!("  registry:  differs (loading would be a cache miss)");
    }
    Ok(())
}
