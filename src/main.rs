//! cmkscore - availability scoring for monitored web endpoints.
//!
//! Turns exported uptime telemetry into a score for the last day and a
//! rolling 30-day score per URL.

mod collect;
mod config;
mod engine;
mod report;
mod runner;

use clap::Parser;
use collect::Snapshot;
use config::ServerConfig;

use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cmkscore", about = "Compute day and 30-day availability scores")]
struct Cli {
    /// Snapshot file with exported monitoring data
    #[arg(long)]
    snapshot: Option<String>,

    /// Only score these URLs (default: every URL in the snapshot)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Directory receiving report folders
    #[arg(long)]
    report_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("cmkscore=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut cfg = ServerConfig::load();
    if let Some(path) = cli.snapshot {
        cfg.snapshot_path = path;
    }
    if let Some(dir) = cli.report_dir {
        cfg.report_dir = dir;
    }
    tracing::info!("Using snapshot at {}", cfg.snapshot_path);

    let snapshot = Snapshot::load(&cfg.snapshot_path)?;

    let urls: Vec<String> = if cli.urls.is_empty() {
        snapshot.urls().map(str::to_string).collect()
    } else {
        for url in &cli.urls {
            snapshot.services_for(url)?;
        }
        cli.urls
    };
    tracing::info!("Scoring {} URLs", urls.len());

    let reports = runner::run(&cfg, Arc::new(snapshot), &urls, Utc::now()).await;
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(())
}
