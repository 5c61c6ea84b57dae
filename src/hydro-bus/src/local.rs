// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-process transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use hydro_core::bus::{validate_filter, BusFuture, MessageHandler};
use hydro_core::{BusError, Message, MessageBus};

use crate::handlers::Handlers;
use crate::router::{Router, SessionId, DEFAULT_SESSION_QUEUE};

/// Hub connecting any number of [`LocalBus`] sessions.
#[derive(Clone)]
pub struct LocalHub {
    router: Arc<Router>,
    capacity: usize,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_QUEUE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            router: Arc::new(Router::new()),
            capacity,
        }
    }

    /// Open a session. Must be called from within a tokio runtime.
    pub fn connect(&self) -> LocalBus {
        let (session, rx) = self.router.register("local", self.capacity);
        let handlers = Arc::new(Handlers::default());
        tokio::spawn(deliver(rx, Arc::clone(&handlers)));
        LocalBus {
            router: Arc::clone(&self.router),
            session,
            handlers,
            connected: AtomicBool::new(true),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

async fn deliver(mut rx: mpsc::Receiver<Message>, handlers: Arc<Handlers>) {
    while let Some(msg) = rx.recv().await {
        handlers.dispatch(msg);
    }
}

/// One session on a [`LocalHub`].
pub struct LocalBus {
    router: Arc<Router>,
    session: SessionId,
    handlers: Arc<Handlers>,
    connected: AtomicBool,
}

impl MessageBus for LocalBus {
    fn publish<'a>(&'a self, topic: &'a str, payload: &'a str) -> BusFuture<'a, ()> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(BusError::NotConnected);
            }
            self.router.publish(topic, payload).map(|_| ())
        })
    }

    fn subscribe<'a>(&'a self, filter: &'a str, handler: MessageHandler) -> BusFuture<'a, ()> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(BusError::NotConnected);
            }
            validate_filter(filter)?;
            self.handlers.add(filter, handler);
            self.router.subscribe(self.session, filter)
        })
    }

    fn unsubscribe<'a>(&'a self, filter: &'a str) -> BusFuture<'a, ()> {
        Box::pin(async move {
            self.handlers.remove(filter);
            if !self.is_connected() {
                return Ok(());
            }
            self.router.unsubscribe(self.session, filter)
        })
    }

    fn disconnect<'a>(&'a self) -> BusFuture<'a, ()> {
        Box::pin(async move {
            if self.connected.swap(false, Ordering::SeqCst) {
                self.router.unregister(self.session);
            }
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for LocalBus {
    fn drop(&mut self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.router.unregister(self.session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro_core::bus::handler;
    use std::time::Duration;

    fn collector() -> (MessageHandler, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            handler(move |msg| {
                let _ = tx.send(msg);
            }),
            rx,
        )
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out")
            .expect("closed")
    }

    #[tokio::test]
    async fn test_publish_subscribe_with_self_echo() {
        let hub = LocalHub::new();
        let a = hub.connect();
        let b = hub.connect();
        let (ha, mut rx_a) = collector();
        let (hb, mut rx_b) = collector();
        a.subscribe("iot/device/mode", ha).await.unwrap();
        b.subscribe("iot/device/+", hb).await.unwrap();

        a.publish("iot/device/mode", "Automatic").await.unwrap();
        assert_eq!(next(&mut rx_a).await.payload, "Automatic");
        assert_eq!(next(&mut rx_b).await.payload, "Automatic");
    }

    #[tokio::test]
    async fn test_per_topic_fifo() {
        let hub = LocalHub::new();
        let a = hub.connect();
        let b = hub.connect();
        let (hb, mut rx_b) = collector();
        b.subscribe("iot/device/sensor", hb).await.unwrap();

        for i in 0..50 {
            a.publish("iot/device/sensor", &i.to_string()).await.unwrap();
        }
        for i in 0..50 {
            assert_eq!(next(&mut rx_b).await.payload, i.to_string());
        }
    }

    #[tokio::test]
    async fn test_publish_after_disconnect_fails() {
        let hub = LocalHub::new();
        let a = hub.connect();
        assert!(a.is_connected());
        a.disconnect().await.unwrap();
        assert!(!a.is_connected());
        assert_eq!(a.publish("t", "x").await, Err(BusError::NotConnected));
        assert_eq!(hub.router().session_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let hub = LocalHub::new();
        let a = hub.connect();
        let (ha, mut rx_a) = collector();
        a.subscribe("t", ha).await.unwrap();
        a.unsubscribe("t").await.unwrap();
        a.publish("t", "x").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_unregisters() {
        let hub = LocalHub::new();
        {
            let _a = hub.connect();
            assert_eq!(hub.router().session_count(), 1);
        }
        assert_eq!(hub.router().session_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_filter_rejected() {
        let hub = LocalHub::new();
        let a = hub.connect();
        let (ha, _rx) = collector();
        assert!(matches!(
            a.subscribe("a/#/b", ha).await,
            Err(BusError::InvalidTopic { .. })
        ));
    }
}
