// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Broker client.
//!
//! The first connect must succeed; after that a link task keeps the session
//! alive, reconnecting with exponential backoff and re-sending every
//! subscription. Publishes fail with `NotConnected` while the link is down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use hydro_core::bus::{validate_filter, validate_topic, BusFuture, MessageHandler};
use hydro_core::{BusError, BusResult, Message, MessageBus};
use hydro_protocol::{parse_frame, Frame, MAX_LINE_BYTES};

use crate::backoff::ExponentialBackoff;
use crate::endpoint::BrokerEndpoint;
use crate::handlers::Handlers;
use crate::io::{read_limited_line, write_json_line};

const OUTBOUND_QUEUE: usize = 256;

#[derive(Debug, Clone)]
pub struct TcpBusOptions {
    pub connect_timeout: Duration,
    pub backoff: ExponentialBackoff,
}

impl Default for TcpBusOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            backoff: ExponentialBackoff::default(),
        }
    }
}

struct Shared {
    endpoint: BrokerEndpoint,
    handlers: Handlers,
    connected: AtomicBool,
}

pub struct TcpBus {
    shared: Arc<Shared>,
    outbound_tx: mpsc::Sender<Frame>,
    shutdown_tx: watch::Sender<bool>,
    link: Mutex<Option<JoinHandle<()>>>,
}

enum LinkEnd {
    Shutdown,
    Dropped(BusError),
}

impl TcpBus {
    /// Connect to the broker. Fails with [`BusError::Connection`] when the
    /// broker cannot be reached.
    pub async fn connect(endpoint: BrokerEndpoint, options: TcpBusOptions) -> BusResult<Self> {
        let stream = open(&endpoint, options.connect_timeout).await?;
        info!("Connected to broker {}", endpoint);

        let shared = Arc::new(Shared {
            endpoint,
            handlers: Handlers::default(),
            connected: AtomicBool::new(true),
        });
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let link = tokio::spawn(run_link(
            Arc::clone(&shared),
            stream,
            outbound_rx,
            shutdown_rx,
            options,
        ));

        Ok(Self {
            shared,
            outbound_tx,
            shutdown_tx,
            link: Mutex::new(Some(link)),
        })
    }

    async fn send(&self, frame: Frame) -> BusResult<()> {
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| BusError::Closed)
    }
}

impl MessageBus for TcpBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a str) -> BusFuture<'a, ()> {
        Box::pin(async move {
            validate_topic(topic)?;
            if !self.is_connected() {
                return Err(BusError::NotConnected);
            }
            self.send(Frame::Publish {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
            .await
        })
    }

    fn subscribe<'a>(&'a self, filter: &'a str, handler: MessageHandler) -> BusFuture<'a, ()> {
        Box::pin(async move {
            validate_filter(filter)?;
            self.shared.handlers.add(filter, handler);
            // While reconnecting the link task re-sends every filter.
            if self.is_connected() {
                self.send(Frame::Subscribe {
                    filter: filter.to_string(),
                })
                .await?;
            }
            Ok(())
        })
    }

    fn unsubscribe<'a>(&'a self, filter: &'a str) -> BusFuture<'a, ()> {
        Box::pin(async move {
            self.shared.handlers.remove(filter);
            if self.is_connected() {
                self.send(Frame::Unsubscribe {
                    filter: filter.to_string(),
                })
                .await?;
            }
            Ok(())
        })
    }

    fn disconnect<'a>(&'a self) -> BusFuture<'a, ()> {
        Box::pin(async move {
            let _ = self.shutdown_tx.send(true);
            let link = self
                .link
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(link) = link {
                let _ = link.await;
            }
            self.shared.connected.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for TcpBus {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn open(endpoint: &BrokerEndpoint, timeout: Duration) -> BusResult<TcpStream> {
    let addr = endpoint.connect_addr();
    match time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(BusError::Connection(format!("{addr}: {e}"))),
        Err(_) => Err(BusError::Connection(format!(
            "{addr}: timed out after {timeout:?}"
        ))),
    }
}

async fn run_link(
    shared: Arc<Shared>,
    mut stream: TcpStream,
    mut outbound_rx: mpsc::Receiver<Frame>,
    mut shutdown_rx: watch::Receiver<bool>,
    options: TcpBusOptions,
) {
    let mut resubscribe = false;
    loop {
        match serve_connection(&shared, stream, &mut outbound_rx, &mut shutdown_rx, resubscribe)
            .await
        {
            LinkEnd::Shutdown => break,
            LinkEnd::Dropped(e) => warn!("Broker link dropped: {}", e),
        }
        shared.connected.store(false, Ordering::SeqCst);

        // Frames queued for the dead link are not replayed.
        let mut discarded = 0usize;
        while outbound_rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} queued frames", discarded);
        }

        let mut attempt = 0u32;
        stream = loop {
            let delay = options.backoff.delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = time::sleep(delay) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Broker client shutting down");
                        return;
                    }
                    continue;
                }
            }

            info!("Reconnecting to broker {} (attempt {})", shared.endpoint, attempt);
            match open(&shared.endpoint, options.connect_timeout).await {
                Ok(stream) => break stream,
                Err(e) => warn!("Reconnect failed: {}", e),
            }
        };
        info!("Reconnected to broker {}", shared.endpoint);
        resubscribe = true;
    }
    shared.connected.store(false, Ordering::SeqCst);
    info!("Broker client shutting down");
}

async fn serve_connection(
    shared: &Arc<Shared>,
    stream: TcpStream,
    outbound_rx: &mut mpsc::Receiver<Frame>,
    shutdown_rx: &mut watch::Receiver<bool>,
    resubscribe: bool,
) -> LinkEnd {
    let (reader, mut writer) = stream.into_split();

    if resubscribe {
        // Up before the snapshot so a racing subscribe is sent, not lost.
        shared.connected.store(true, Ordering::SeqCst);
        for filter in shared.handlers.filters() {
            if let Err(e) = write_json_line(&mut writer, &Frame::Subscribe { filter }).await {
                return LinkEnd::Dropped(e.into());
            }
        }
    }

    // Line reads are not cancel-safe; the reader gets its own task.
    let mut reader_task = tokio::spawn(read_loop(Arc::clone(shared), reader));

    let end = loop {
        tokio::select! {
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break LinkEnd::Shutdown; };
                if let Err(e) = write_json_line(&mut writer, &frame).await {
                    break LinkEnd::Dropped(e.into());
                }
            }
            res = &mut reader_task => {
                break match res {
                    Ok(Ok(())) => LinkEnd::Dropped(BusError::Io("closed by broker".into())),
                    Ok(Err(e)) => LinkEnd::Dropped(e),
                    Err(e) => LinkEnd::Dropped(BusError::Io(e.to_string())),
                };
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    // Flush what was queued before the disconnect.
                    while let Ok(frame) = outbound_rx.try_recv() {
                        if write_json_line(&mut writer, &frame).await.is_err() {
                            break;
                        }
                    }
                    break LinkEnd::Shutdown;
                }
            }
        }
    };

    reader_task.abort();
    let _ = writer.shutdown().await;
    end
}

async fn read_loop(shared: Arc<Shared>, reader: OwnedReadHalf) -> BusResult<()> {
    let mut reader = BufReader::new(reader);
    loop {
        let Some(line) = read_limited_line(&mut reader, MAX_LINE_BYTES).await? else {
            return Ok(());
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_frame(trimmed) {
            Ok(Frame::Deliver { topic, payload }) => {
                shared.handlers.dispatch(Message { topic, payload });
            }
            Ok(other) => warn!("Unexpected frame from broker: {:?}", other),
            Err(e) => warn!("Invalid frame from broker: {} / {}", trimmed, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro_core::bus::handler;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    async fn local_endpoint(listener: &TcpListener) -> BrokerEndpoint {
        let addr = listener.local_addr().unwrap();
        BrokerEndpoint {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = local_endpoint(&listener).await;
        drop(listener);

        let result = TcpBus::connect(endpoint, TcpBusOptions::default()).await;
        assert!(matches!(result, Err(BusError::Connection(_))));
    }

    #[tokio::test]
    async fn test_frames_on_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = local_endpoint(&listener).await;

        let bus = TcpBus::connect(endpoint, TcpBusOptions::default())
            .await
            .unwrap();
        let (socket, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut lines = BufReader::new(reader).lines();

        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.subscribe(
            "iot/device/mode",
            handler(move |msg| {
                let _ = tx.send(msg);
            }),
        )
        .await
        .unwrap();
        bus.publish("iot/device/mode", "Manual").await.unwrap();

        assert_eq!(
            parse_frame(&lines.next_line().await.unwrap().unwrap()).unwrap(),
            Frame::Subscribe {
                filter: "iot/device/mode".into()
            }
        );
        assert_eq!(
            parse_frame(&lines.next_line().await.unwrap().unwrap()).unwrap(),
            Frame::Publish {
                topic: "iot/device/mode".into(),
                payload: "Manual".into()
            }
        );

        writer
            .write_all(b"garbage\n{\"op\":\"deliver\",\"topic\":\"iot/device/mode\",\"payload\":\"Automatic\"}\n")
            .await
            .unwrap();
        let msg = time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg, Message::new("iot/device/mode", "Automatic"));

        bus.disconnect().await.unwrap();
        assert!(!bus.is_connected());
        assert_eq!(
            bus.publish("iot/device/mode", "Manual").await,
            Err(BusError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_publish_rejects_wildcards() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = local_endpoint(&listener).await;
        let bus = TcpBus::connect(endpoint, TcpBusOptions::default())
            .await
            .unwrap();
        assert!(matches!(
            bus.publish("iot/#", "x").await,
            Err(BusError::InvalidTopic { .. })
        ));
    }

    #[tokio::test]
    async fn test_reconnects_and_resubscribes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = local_endpoint(&listener).await;
        let options = TcpBusOptions {
            connect_timeout: Duration::from_secs(1),
            backoff: ExponentialBackoff::new(Duration::from_millis(20), Duration::from_millis(100)),
        };

        let bus = TcpBus::connect(endpoint, options).await.unwrap();
        bus.subscribe("iot/device/response", handler(|_| {}))
            .await
            .unwrap();

        let (first, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(first).lines();
        assert!(lines.next_line().await.unwrap().is_some());
        // Broker goes away.
        drop(lines);

        let (second, _) = time::timeout(Duration::from_secs(2), listener.accept())
            .await
            .unwrap()
            .unwrap();
        let mut lines = BufReader::new(second).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert_eq!(
            parse_frame(&line).unwrap(),
            Frame::Subscribe {
                filter: "iot/device/response".into()
            }
        );

        // Link is marked up again once subscriptions are restored.
        for _ in 0..50 {
            if bus.is_connected() {
                break;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
        assert!(bus.is_connected());
        bus.disconnect().await.unwrap();
    }
}
