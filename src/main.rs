//! `slirc-ingest`: connect to an IRC server and print one JSON record per
//! line on stdout.
//!
//! Usage: `slirc-ingest [config.toml]`

use std::io::Write;

use anyhow::Context;
use slirc_ingest::{logging, Config, Ingestor, Record};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    logging::init(&config.log_level);
    info!(path = %config_path, "configuration loaded");

    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<Record>();
    let writer = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        while let Some(record) = output_rx.blocking_recv() {
            if let Err(e) = writeln!(out, "{}", record.to_json_line()).and_then(|_| out.flush()) {
                error!(error = %e, "failed to write record");
                break;
            }
        }
    });

    let handle = Ingestor::start(&config, output_tx)
        .await
        .context("failed to start ingestion")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("shutdown requested");
        }
        _ = handle.closed() => {
            info!("connection closed");
        }
    }

    handle.stop().await;
    writer.await.context("record writer panicked")?;
    Ok(())
}
