// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::bus::{handler, Message, MessageBus};
use crate::device::state::Mode;
use crate::device::task::DEFAULT_INBOUND_CAPACITY;
use crate::{DynResult, Topics};

use super::{PeerCoordinator, PeerPolicy};

/// Start of the switch timer when the interval overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Configuration for the peer task.
#[derive(Debug, Clone)]
pub struct PeerTaskConfig {
    pub topics: Topics,
    pub initial_mode: Mode,
    pub switch_interval: Duration,
    pub policy: PeerPolicy,
    pub follow_remote_mode: bool,
    pub inbound_capacity: usize,
}

impl Default for PeerTaskConfig {
    fn default() -> Self {
        Self {
            topics: Topics::default(),
            initial_mode: Mode::Manual,
            switch_interval: Duration::from_secs(20),
            policy: PeerPolicy::default(),
            follow_remote_mode: true,
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
        }
    }
}

/// Run the peer until shutdown is signalled. The current belief is
/// mirrored on `belief_tx`.
pub async fn run_peer_task(
    config: PeerTaskConfig,
    bus: Arc<dyn MessageBus>,
    belief_tx: watch::Sender<Mode>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DynResult<()> {
    let topics = config.topics;
    let mut peer = PeerCoordinator::new(
        config.initial_mode,
        config.policy,
        config.follow_remote_mode,
    );

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Message>(config.inbound_capacity.max(1));
    for filter in [&topics.sensor, &topics.mode] {
        let tx = inbound_tx.clone();
        bus.subscribe(
            filter,
            handler(move |msg| {
                if let Err(e) = tx.try_send(msg) {
                    warn!("Dropping inbound peer message: {}", e);
                }
            }),
        )
        .await?;
        info!("Subscribed to {}", filter);
    }
    drop(inbound_tx);

    let _ = belief_tx.send(peer.belief());
    publish_mode(bus.as_ref(), &topics, peer.belief()).await;

    let period = config.switch_interval.max(Duration::from_millis(1));
    let now = Instant::now();
    let first_switch = now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE);
    let mut switch_timer = time::interval_at(first_switch, period);
    info!(
        "Peer ready: belief={} switch_interval={:?}",
        peer.belief(),
        period
    );

    loop {
        tokio::select! {
            _ = switch_timer.tick() => {
                let mode = peer.toggle();
                info!("Switching belief to {}", mode);
                let _ = belief_tx.send(mode);
                publish_mode(bus.as_ref(), &topics, mode).await;
            },

            Some(msg) = inbound_rx.recv() => {
                if msg.topic == topics.sensor {
                    match peer.on_reading(&msg.payload) {
                        Ok(Some(actuation)) => {
                            debug!("Reading {} -> override {}", msg.payload, actuation);
                            let payload = actuation.as_payload();
                            if let Err(e) = bus.publish(&topics.response, payload).await {
                                warn!("Publish to {} failed: {}", topics.response, e);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("Dropping message on {}: {}", msg.topic, e),
                    }
                } else if msg.topic == topics.mode {
                    match peer.on_mode(&msg.payload) {
                        Ok(true) => {
                            info!("Adopted remote mode {}", peer.belief());
                            let _ = belief_tx.send(peer.belief());
                        }
                        Ok(false) => {}
                        Err(e) => warn!("Dropping message on {}: {}", msg.topic, e),
                    }
                }
            },

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Shutdown requested");
                    break;
                }
            },
        }
    }

    if let Err(e) = bus.disconnect().await {
        warn!("Bus disconnect failed: {}", e);
    }
    info!("peer_task shutting down");
    Ok(())
}

async fn publish_mode(bus: &dyn MessageBus, topics: &Topics, mode: Mode) {
    if let Err(e) = bus.publish(&topics.mode, mode.as_payload()).await {
        warn!("Publish to {} failed: {}", topics.mode, e);
    }
}
