// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use hydro_app::{init_logging, ConfigFile};
use hydro_bus::{run_broker, BrokerOptions, Router};
use hydro_core::DynResult;

use config::BrokerConfig;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - message broker");

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
    /// IP address to listen on
    #[arg(short = 'l', long = "listen")]
    listen: Option<IpAddr>,
    /// TCP port to listen on
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", BrokerConfig::example_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = BrokerConfig::load(cli.config.as_deref())?;
    if cli.log_level.is_some() {
        cfg.general.log_level = cli.log_level.clone();
    }
    cfg.validate()
        .map_err(|e| format!("Invalid broker configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let addr = SocketAddr::from((
        cli.listen.unwrap_or(cfg.listen.listen),
        cli.port.unwrap_or(cfg.listen.port),
    ));
    let listener = TcpListener::bind(addr).await?;
    info!("Starting hydro-broker on {}", addr);

    let options = BrokerOptions {
        client_queue: cfg.limits.client_queue,
    };
    let router = Arc::new(Router::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let broker = tokio::spawn(run_broker(listener, router, options, shutdown_rx));

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Ctrl+C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
        res = broker => {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Broker error: {:?}", e),
                Err(e) => error!("Broker task failed: {:?}", e),
            }
        }
    }
    Ok(())
}
