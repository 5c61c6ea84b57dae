// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-over-TCP operator control listener for hydro-device.
//!
//! Accepts client connections speaking the `ControlCommand`/`ControlResponse`
//! protocol defined in `hydro-protocol`.

use std::net::SocketAddr;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info, warn};

use hydro_bus::io::{read_limited_line, write_json_line};
use hydro_core::{DeviceCommand, DeviceRequest, DeviceSnapshot};
use hydro_protocol::{control_command_to_device, parse_control, ControlResponse, MAX_LINE_BYTES};

/// Run the control listener, accepting operator connections until shutdown.
pub async fn run_control_listener(
    listener: TcpListener,
    device_tx: mpsc::Sender<DeviceRequest>,
    state_rx: watch::Receiver<DeviceSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!("Control listener on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                info!("Operator connected: {}", peer);

                let tx = device_tx.clone();
                let srx = state_rx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(socket, peer, tx, srx).await {
                        error!("Operator {} error: {:?}", peer, e);
                    }
                });
            },

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Control listener shutting down");
                    return Ok(());
                }
            },
        }
    }
}

async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    tx: mpsc::Sender<DeviceRequest>,
    state_rx: watch::Receiver<DeviceSnapshot>,
) -> std::io::Result<()> {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    while let Some(line) = read_limited_line(&mut reader, MAX_LINE_BYTES).await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let resp = match parse_control(trimmed) {
            Ok(cmd) => match control_command_to_device(cmd) {
                Ok(cmd) => execute(cmd, &tx, &state_rx).await,
                Err(e) => ControlResponse::err(e.to_string()),
            },
            Err(e) => {
                warn!("Invalid JSON from {}: {} / {}", addr, trimmed, e);
                ControlResponse::err(format!("Invalid JSON: {}", e))
            }
        };
        write_json_line(&mut writer, &resp).await?;
    }

    info!("Operator {} disconnected", addr);
    Ok(())
}

async fn execute(
    cmd: DeviceCommand,
    tx: &mpsc::Sender<DeviceRequest>,
    state_rx: &watch::Receiver<DeviceSnapshot>,
) -> ControlResponse {
    // Snapshots come straight from the watch channel.
    if matches!(cmd, DeviceCommand::GetSnapshot) {
        return ControlResponse::ok(state_rx.borrow().clone());
    }

    let (resp_tx, resp_rx) = oneshot::channel();
    let req = DeviceRequest {
        cmd,
        respond_to: resp_tx,
    };
    if let Err(e) = tx.send(req).await {
        error!("Failed to send request to device task: {:?}", e.0.cmd);
        return ControlResponse::err("Internal error: device task not available");
    }

    match resp_rx.await {
        Ok(Ok(snapshot)) => ControlResponse::ok(snapshot),
        Ok(Err(err)) => ControlResponse::err(err.to_string()),
        Err(e) => {
            error!("Device response oneshot recv error: {:?}", e);
            ControlResponse::err("Internal error waiting for device response")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, Lines};
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    use hydro_bus::LocalHub;
    use hydro_core::device::{
        run_device_task, DeviceState, DeviceTaskConfig, SensorModel, SensorRanges,
    };
    use hydro_core::{Actuation, Mode};

    struct Operator {
        lines: Lines<BufReader<OwnedReadHalf>>,
        writer: OwnedWriteHalf,
    }

    impl Operator {
        async fn call(&mut self, line: &str) -> ControlResponse {
            self.writer
                .write_all(format!("{line}\n").as_bytes())
                .await
                .unwrap();
            let reply = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&reply).unwrap()
        }
    }

    async fn start() -> (Operator, watch::Sender<bool>) {
        let hub = LocalHub::new();
        let config = DeviceTaskConfig {
            sensor: SensorModel::seeded(1, SensorRanges::default()),
            ..DeviceTaskConfig::default()
        };
        let initial = DeviceState::default().snapshot();
        let (device_tx, device_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(run_device_task(
            config,
            Arc::new(hub.connect()),
            device_rx,
            state_tx,
            shutdown_rx.clone(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_control_listener(
            listener,
            device_tx,
            state_rx,
            shutdown_rx,
        ));

        let socket = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = socket.into_split();
        let operator = Operator {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        (operator, shutdown_tx)
    }

    #[tokio::test]
    async fn test_get_state() {
        let (mut op, _shutdown) = start().await;
        let resp = op.call(r#"{"cmd":"get_state"}"#).await;
        assert!(resp.success);
        let state = resp.state.unwrap();
        assert_eq!(state.mode, Mode::Manual);
        assert!(state.pump_toggle_enabled);
    }

    #[tokio::test]
    async fn test_toggle_then_switch_mode() {
        let (mut op, _shutdown) = start().await;

        let resp = op.call(r#"{"cmd":"toggle_pump"}"#).await;
        assert_eq!(resp.state.unwrap().actuation, Actuation::Active);

        let resp = op.call(r#"{"cmd":"set_mode","mode":"Automatic"}"#).await;
        let state = resp.state.unwrap();
        assert_eq!(state.mode, Mode::Automatic);
        assert!(state.thresholds_editable);

        let resp = op.call(r#"{"cmd":"toggle_pump"}"#).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("invalid state"));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let (mut op, _shutdown) = start().await;

        let resp = op.call("not json").await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().starts_with("Invalid JSON"));

        let resp = op.call(r#"{"cmd":"set_mode","mode":"auto"}"#).await;
        assert!(!resp.success);

        op.call(r#"{"cmd":"set_mode","mode":"Automatic"}"#).await;
        let resp = op.call(r#"{"cmd":"set_thresholds","low":80,"high":20}"#).await;
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("invalid threshold"));

        let resp = op.call(r#"{"cmd":"set_update_period","secs":0}"#).await;
        assert!(!resp.success);

        let resp = op.call(r#"{"cmd":"get_state"}"#).await;
        let state = resp.state.unwrap();
        assert_eq!(state.low_threshold, 30);
        assert_eq!(state.high_threshold, 70);
        assert_eq!(state.update_period_secs, 3);
    }
}
