// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use hydro_core::device::{run_device_task, DeviceState, DeviceTaskConfig, SensorModel, SensorRanges};
use hydro_core::peer::task::{run_peer_task, PeerTaskConfig};
use hydro_core::{DeviceRequest, DeviceSnapshot, DynResult, MessageBus, Mode, Reading};

pub struct DeviceHandle {
    pub state_rx: watch::Receiver<DeviceSnapshot>,
    pub requests: mpsc::Sender<DeviceRequest>,
    pub shutdown_tx: watch::Sender<bool>,
    pub handle: JoinHandle<DynResult<()>>,
}

pub struct PeerHandle {
    pub belief_rx: watch::Receiver<Mode>,
    pub shutdown_tx: watch::Sender<bool>,
    pub handle: JoinHandle<DynResult<()>>,
}

pub fn device_state(mode: Mode, reading: i32) -> DeviceState {
    DeviceState {
        mode,
        reading: Reading::clamped(reading),
        ..DeviceState::default()
    }
}

pub fn spawn_device(bus: Arc<dyn MessageBus>, initial_state: DeviceState) -> DeviceHandle {
    let config = DeviceTaskConfig {
        initial_state: initial_state.clone(),
        sensor: SensorModel::seeded(7, SensorRanges::default()),
        ..DeviceTaskConfig::default()
    };
    let (requests, rx) = mpsc::channel(8);
    let (state_tx, state_rx) = watch::channel(initial_state.snapshot());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_device_task(config, bus, rx, state_tx, shutdown_rx));
    DeviceHandle {
        state_rx,
        requests,
        shutdown_tx,
        handle,
    }
}

pub fn spawn_peer(
    bus: Arc<dyn MessageBus>,
    initial_mode: Mode,
    switch_interval: Duration,
) -> PeerHandle {
    let config = PeerTaskConfig {
        initial_mode,
        switch_interval,
        ..PeerTaskConfig::default()
    };
    let (belief_tx, belief_rx) = watch::channel(initial_mode);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run_peer_task(config, bus, belief_tx, shutdown_rx));
    PeerHandle {
        belief_rx,
        shutdown_tx,
        handle,
    }
}

/// Wait until the device snapshot satisfies `pred`, failing after `limit`.
pub async fn wait_device<F>(device: &mut DeviceHandle, limit: Duration, pred: F) -> DeviceSnapshot
where
    F: FnMut(&DeviceSnapshot) -> bool,
{
    tokio::time::timeout(limit, device.state_rx.wait_for(pred))
        .await
        .expect("device condition not reached in time")
        .expect("device task gone")
        .clone()
}

pub async fn wait_belief(peer: &mut PeerHandle, limit: Duration, mode: Mode) {
    tokio::time::timeout(limit, peer.belief_rx.wait_for(|m| *m == mode))
        .await
        .expect("peer belief not reached in time")
        .expect("peer task gone");
}
