// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use hydro_app::{init_logging, ConfigFile};
use hydro_bus::{parse_broker_url, TcpBus};
use hydro_core::peer::run_peer_task;
use hydro_core::{DynResult, MessageBus};

use config::PeerConfig;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - remote pump coordinator");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Broker address (host:port)
    #[arg(short = 'u', long = "broker")]
    broker: Option<String>,
    /// Seconds between mode switches
    #[arg(long = "switch-interval", value_name = "SECS")]
    switch_interval: Option<u64>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", PeerConfig::example_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = PeerConfig::load(cli.config.as_deref())?;
    if let Some(ref url) = cli.broker {
        cfg.broker.url = url.clone();
    }
    if let Some(secs) = cli.switch_interval {
        cfg.peer.mode_switch_interval_secs = secs;
    }
    if cli.log_level.is_some() {
        cfg.general.log_level = cli.log_level.clone();
    }
    cfg.validate()
        .map_err(|e| format!("Invalid peer configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let task_config = cfg.task_config()?;
    let endpoint = parse_broker_url(&cfg.broker.url)?;
    let bus = TcpBus::connect(endpoint.clone(), cfg.bus_options())
        .await
        .map_err(|e| format!("Cannot reach broker {}: {}", endpoint, e))?;
    let bus: Arc<dyn MessageBus> = Arc::new(bus);

    info!(
        "Starting hydro-peer (broker: {}, belief: {}, switch every {}s)",
        endpoint, task_config.initial_mode, cfg.peer.mode_switch_interval_secs
    );

    let (belief_tx, _belief_rx) = watch::channel(task_config.initial_mode);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let peer = tokio::spawn(async move {
        if let Err(e) = run_peer_task(task_config, bus, belief_tx, shutdown_rx).await {
            error!("Peer task error: {:?}", e);
        }
    });

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(Duration::from_millis(400), peer)
        .await
        .is_err()
    {
        error!("Peer task did not stop in time");
    }
    Ok(())
}
