// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The router daemon entry point (spec §4.11). Loads a segment
// configuration, constructs the MemoryManager, and runs the discovery
// loop that matches ports and relays CaPro messages between them.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use iceshim::config::RouterConfig;
use iceshim::router::DaemonContext;

#[derive(Parser, Debug)]
#[command(name = "iceshim-router", about = "Zero-copy shared-memory IPC router daemon")]
struct RouterArgs {
    /// Path to a RouterConfig TOML file. Falls back to a built-in
    /// single-tier default when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the config file's log_filter / RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,

    /// Discovery loop poll interval, in milliseconds.
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
}

fn main() {
    let args = RouterArgs::parse();

    let config = match &args.config {
        Some(path) => RouterConfig::from_file(path).unwrap_or_else(|e| {
            eprintln!("failed to load config {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => RouterConfig::default_standalone(),
    };

    let filter = args
        .log_filter
        .clone()
        .unwrap_or_else(|| config.log_filter.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        segment = %config.segment.name,
        mempools = config.segment.mempools.len(),
        compatibility = ?config.compatibility,
        "router starting"
    );

    let ctx = DaemonContext::new(config);
    ctx.run_discovery_loop(Duration::from_millis(args.tick_ms));
}
