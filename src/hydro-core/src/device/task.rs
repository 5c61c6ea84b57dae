// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Device task: owns the device state and serializes every input.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Sleep};
use tracing::{debug, info, warn};

use crate::bus::{handler, Message, MessageBus};
use crate::device::events::{DeviceEventEmitter, DeviceListener};
use crate::device::machine::{DeviceEvent, DeviceMachine, Effect};
use crate::device::sensor::{SensorModel, SensorRanges};
use crate::device::state::DeviceState;
use crate::{DeviceError, DeviceRequest, DeviceResult, DeviceSnapshot, DynResult, Topics};

/// Default capacity of the inbound message queue.
pub const DEFAULT_INBOUND_CAPACITY: usize = 64;

/// Configuration for the device task.
pub struct DeviceTaskConfig {
    pub topics: Topics,
    pub initial_state: DeviceState,
    pub sensor: SensorModel,
    pub inbound_capacity: usize,
    pub listeners: Vec<Arc<dyn DeviceListener>>,
}

impl Default for DeviceTaskConfig {
    fn default() -> Self {
        Self {
            topics: Topics::default(),
            initial_state: DeviceState::default(),
            sensor: SensorModel::from_entropy(SensorRanges::default()),
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            listeners: Vec::new(),
        }
    }
}

struct TaskContext<'a> {
    machine: &'a mut DeviceMachine,
    emitter: &'a DeviceEventEmitter,
    bus: &'a dyn MessageBus,
    topics: &'a Topics,
    state_tx: &'a watch::Sender<DeviceSnapshot>,
}

/// Run the device task until the request channel closes or shutdown is
/// signalled. The bus is disconnected on exit.
pub async fn run_device_task(
    config: DeviceTaskConfig,
    bus: Arc<dyn MessageBus>,
    mut rx: mpsc::Receiver<DeviceRequest>,
    state_tx: watch::Sender<DeviceSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DynResult<()> {
    let DeviceTaskConfig {
        topics,
        initial_state,
        sensor,
        inbound_capacity,
        listeners,
    } = config;

    let mut emitter = DeviceEventEmitter::new();
    for listener in listeners {
        emitter.register(listener);
    }

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Message>(inbound_capacity.max(1));
    for filter in [&topics.response, &topics.mode] {
        let tx = inbound_tx.clone();
        bus.subscribe(
            filter,
            handler(move |msg| {
                if let Err(e) = tx.try_send(msg) {
                    warn!("Dropping inbound device message: {}", e);
                }
            }),
        )
        .await?;
        info!("Subscribed to {}", filter);
    }
    drop(inbound_tx);

    let mut machine = DeviceMachine::new(initial_state, sensor);
    let _ = state_tx.send(machine.state().snapshot());
    info!(
        "Device ready: mode={} reading={} period={}s",
        machine.state().mode,
        machine.state().reading,
        machine.state().update_period.secs()
    );

    let mut tick_sleep: Pin<Box<Sleep>> =
        Box::pin(time::sleep(machine.state().update_period.duration()));

    loop {
        let mut ctx = TaskContext {
            machine: &mut machine,
            emitter: &emitter,
            bus: bus.as_ref(),
            topics: &topics,
            state_tx: &state_tx,
        };

        tokio::select! {
            _ = &mut tick_sleep => {
                if let Err(e) = apply_event(&mut ctx, DeviceEvent::Tick).await {
                    warn!("Tick failed: {}", e);
                }
                // Period is read after the tick so operator edits apply here.
                let period = ctx.machine.state().update_period.duration();
                tick_sleep = Box::pin(time::sleep(period));
            },

            maybe_req = rx.recv() => {
                let Some(DeviceRequest { cmd, respond_to }) = maybe_req else { break; };
                let cmd_label = format!("{:?}", cmd);
                let started = Instant::now();

                let result = match DeviceEvent::from_command(cmd) {
                    Some(event) => apply_event(&mut ctx, event).await,
                    None => Ok(ctx.machine.state().snapshot()),
                };
                if let Err(e) = &result {
                    warn!("Operator command {} rejected: {}", cmd_label, e);
                }
                let _ = respond_to.send(result);

                let elapsed = started.elapsed();
                if elapsed > Duration::from_millis(500) {
                    warn!("Device command {} took {:?}", cmd_label, elapsed);
                } else {
                    debug!("Device command {} completed in {:?}", cmd_label, elapsed);
                }
            },

            Some(msg) = inbound_rx.recv() => {
                handle_inbound(&mut ctx, msg).await;
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
    info!("device_task shutting down");
    Ok(())
}

async fn handle_inbound(ctx: &mut TaskContext<'_>, msg: Message) {
    match inbound_event(ctx.topics, &msg) {
        Ok(event) => {
            let label = event.to_string();
            match apply_event(ctx, event).await {
                Ok(_) => debug!("Applied {}", label),
                Err(e) => warn!("Ignoring {}: {}", label, e),
            }
        }
        Err(e) => {
            warn!("Dropping message on {}: {}", msg.topic, e);
            ctx.emitter.notify_rejected(&msg.to_string(), &e);
        }
    }
}

/// Decode a message received on one of the device's subscriptions.
pub fn inbound_event(topics: &Topics, msg: &Message) -> DeviceResult<DeviceEvent> {
    if msg.topic == topics.response {
        Ok(DeviceEvent::OverrideReceived(msg.payload.parse()?))
    } else if msg.topic == topics.mode {
        Ok(DeviceEvent::ModeAsserted(msg.payload.parse()?))
    } else {
        Err(DeviceError::malformed(format!(
            "unexpected topic '{}'",
            msg.topic
        )))
    }
}

async fn apply_event(
    ctx: &mut TaskContext<'_>,
    event: DeviceEvent,
) -> DeviceResult<DeviceSnapshot> {
    let ticked = matches!(event, DeviceEvent::Tick);
    let label = event.to_string();
    let old_state = ctx.machine.state().clone();

    let effects = match ctx.machine.handle(event) {
        Ok(effects) => effects,
        Err(e) => {
            ctx.emitter.notify_rejected(&label, &e);
            return Err(e);
        }
    };

    let new_state = ctx.machine.state();
    ctx.emitter.emit_state_changes(&old_state, new_state, ticked);
    let snapshot = new_state.snapshot();
    let _ = ctx.state_tx.send(snapshot.clone());

    for effect in effects {
        let (topic, payload) = match effect {
            Effect::PublishReading(reading) => (&ctx.topics.sensor, reading.as_payload()),
            Effect::PublishMode(mode) => (&ctx.topics.mode, mode.as_payload().to_string()),
            Effect::PublishPump(act) => (&ctx.topics.pump, act.as_payload().to_string()),
        };
        // Failures are not retried.
        if let Err(e) = ctx.bus.publish(topic, &payload).await {
            warn!("Publish to {} failed: {}", topic, e);
        }
    }

    Ok(snapshot)
}
