// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;
mod listener;
mod observer;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use hydro_app::{init_logging, ConfigFile};
use hydro_bus::{parse_broker_url, TcpBus};
use hydro_core::device::{run_device_task, DeviceListener, DeviceTaskConfig, SensorModel};
use hydro_core::device::task::DEFAULT_INBOUND_CAPACITY;
use hydro_core::{DeviceRequest, DynResult, MessageBus};

use config::DeviceConfig;
use observer::LogListener;

const PKG_DESCRIPTION: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " - moisture sensor and pump controller"
);
const DEVICE_TASK_CHANNEL_BUFFER: usize = 32;

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
    /// Fixed sensor seed for reproducible runs
    #[arg(long = "seed")]
    seed: Option<u64>,
    /// Port for the operator control listener
    #[arg(long = "control-port")]
    control_port: Option<u16>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

/// Apply CLI overrides on top of the loaded file.
fn apply_cli(cli: &Cli, cfg: &mut DeviceConfig) {
    if let Some(ref url) = cli.broker {
        cfg.broker.url = url.clone();
    }
    if cli.seed.is_some() {
        cfg.device.seed = cli.seed;
    }
    if let Some(port) = cli.control_port {
        cfg.control.port = port;
    }
    if cli.log_level.is_some() {
        cfg.general.log_level = cli.log_level.clone();
    }
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", DeviceConfig::example_toml());
        return Ok(());
    }

    let (mut cfg, config_path) = DeviceConfig::load(cli.config.as_deref())?;
    apply_cli(&cli, &mut cfg);
    cfg.validate()
        .map_err(|e| format!("Invalid device configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    let endpoint = parse_broker_url(&cfg.broker.url)?;
    let bus = TcpBus::connect(endpoint.clone(), cfg.broker.bus_options())
        .await
        .map_err(|e| format!("Cannot reach broker {}: {}", endpoint, e))?;
    let bus: Arc<dyn MessageBus> = Arc::new(bus);

    let initial_state = cfg.initial_state()?;
    let ranges = cfg.sensor_ranges()?;
    let sensor = match cfg.device.seed {
        Some(seed) => {
            info!("Using sensor seed {}", seed);
            SensorModel::seeded(seed, ranges)
        }
        None => SensorModel::from_entropy(ranges),
    };
    let listeners: Vec<Arc<dyn DeviceListener>> = vec![Arc::new(LogListener)];
    let task_config = DeviceTaskConfig {
        topics: cfg.topics(),
        initial_state: initial_state.clone(),
        sensor,
        inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        listeners,
    };

    info!(
        "Starting hydro-device (broker: {}, topics: {}/*)",
        endpoint,
        cfg.topics.prefix.trim_end_matches('/')
    );

    let (tx, rx) = mpsc::channel::<DeviceRequest>(DEVICE_TASK_CHANNEL_BUFFER);
    let (state_tx, state_rx) = watch::channel(initial_state.snapshot());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut task_handles: Vec<JoinHandle<()>> = Vec::new();

    let device_shutdown_rx = shutdown_rx.clone();
    task_handles.push(tokio::spawn(async move {
        if let Err(e) = run_device_task(task_config, bus, rx, state_tx, device_shutdown_rx).await {
            error!("Device task error: {:?}", e);
        }
    }));

    if cfg.control.enabled {
        let control_addr = SocketAddr::from((cfg.control.listen, cfg.control.port));
        let control_listener = TcpListener::bind(control_addr).await?;
        let device_tx = tx.clone();
        let listener_shutdown_rx = shutdown_rx.clone();
        task_handles.push(tokio::spawn(async move {
            if let Err(e) = listener::run_control_listener(
                control_listener,
                device_tx,
                state_rx,
                listener_shutdown_rx,
            )
            .await
            {
                error!("Control listener error: {:?}", e);
            }
        }));
    }

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    let _ = shutdown_tx.send(true);
    drop(tx);
    tokio::time::sleep(Duration::from_millis(400)).await;

    for handle in &task_handles {
        if !handle.is_finished() {
            handle.abort();
        }
    }
    for handle in task_handles {
        let _ = handle.await;
    }
    Ok(())
}
