// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! JSON-lines TCP broker.
//!
//! Each client connection becomes one [`Router`] session. Clients send
//! `subscribe`, `unsubscribe` and `publish` frames; matching messages are
//! written back as `deliver` frames.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use hydro_core::Message;
use hydro_protocol::{parse_frame, Frame, MAX_LINE_BYTES};

use crate::io::{read_limited_line, write_json_line};
use crate::router::{Router, SessionId, DEFAULT_SESSION_QUEUE};

#[derive(Debug, Clone)]
pub struct BrokerOptions {
    /// Per-client delivery queue depth.
    pub client_queue: usize,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            client_queue: DEFAULT_SESSION_QUEUE,
        }
    }
}

/// Accept clients on `listener` until shutdown is signalled.
pub async fn run_broker(
    listener: TcpListener,
    router: Arc<Router>,
    options: BrokerOptions,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    info!("Broker listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                info!("Client connected: {}", peer);

                let router = Arc::clone(&router);
                let client_queue = options.client_queue;
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(async move {
                    let res = handle_client(socket, peer, router, client_queue, shutdown_rx).await;
                    if let Err(e) = res {
                        error!("Client {} error: {}", peer, e);
                    }
                });
            },

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Broker shutting down");
                    return Ok(());
                }
            },
        }
    }
}

async fn handle_client(
    socket: TcpStream,
    peer: SocketAddr,
    router: Arc<Router>,
    client_queue: usize,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let (reader, writer) = socket.into_split();
    let (session, rx) = router.register(peer.to_string(), client_queue);
    let writer_task = tokio::spawn(write_deliveries(rx, writer, peer));

    let mut reader = BufReader::new(reader);
    let result = loop {
        let line = tokio::select! {
            line = read_limited_line(&mut reader, MAX_LINE_BYTES) => line,
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break Ok(());
                }
                continue;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Client {} disconnected", peer);
                break Ok(());
            }
            Err(e) => break Err(e),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_frame(trimmed) {
            Ok(frame) => handle_frame(&router, session, peer, frame),
            Err(e) => warn!("Invalid frame from {}: {} / {}", peer, trimmed, e),
        }
    };

    router.unregister(session);
    writer_task.abort();
    result
}

fn handle_frame(router: &Router, session: SessionId, peer: SocketAddr, frame: Frame) {
    match frame {
        Frame::Subscribe { filter } => match router.subscribe(session, &filter) {
            Ok(()) => debug!("{} subscribed to {}", peer, filter),
            Err(e) => warn!("{} subscribe {} failed: {}", peer, filter, e),
        },
        Frame::Unsubscribe { filter } => {
            if let Err(e) = router.unsubscribe(session, &filter) {
                warn!("{} unsubscribe {} failed: {}", peer, filter, e);
            }
        }
        Frame::Publish { topic, payload } => {
            if let Err(e) = router.publish(&topic, &payload) {
                warn!("{} publish to {} failed: {}", peer, topic, e);
            }
        }
        Frame::Deliver { topic, .. } => {
            warn!("Ignoring deliver frame from {} on {}", peer, topic);
        }
    }
}

async fn write_deliveries(
    mut rx: mpsc::Receiver<Message>,
    mut writer: OwnedWriteHalf,
    peer: SocketAddr,
) {
    while let Some(msg) = rx.recv().await {
        let frame = Frame::Deliver {
            topic: msg.topic,
            payload: msg.payload,
        };
        if let Err(e) = write_json_line(&mut writer, &frame).await {
            warn!("Write to {} failed: {}", peer, e);
            break;
        }
    }
}
