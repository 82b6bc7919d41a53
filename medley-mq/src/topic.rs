//! Typed topic publish/subscribe over the transport seam.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::transport::Transport;

/// A type capable of handling a topic event delivery.
#[async_trait]
pub trait EventHandler<T>: Send + Sync + 'static {
    async fn handle(&self, event: T) -> Result<()>;
}

/// A client for topic broadcast by named channel. Independent of the RPC
/// layer; cheap to clone.
#[derive(Clone)]
pub struct TopicClient {
    transport: Arc<dyn Transport>,
}

impl TopicClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Broadcast an event on the given channel, fire-and-forget.
    pub async fn publish<T: Serialize>(&self, channel: &str, event: &T) -> Result<()> {
        let payload = serde_json::to_vec(event).context("error encoding topic event")?;
        self.transport.publish(channel, payload.into()).await
    }

    /// Subscribe to the given channel, invoking the handler once per decoded
    /// event. Events are handled sequentially, so a handler owning mutable
    /// state needs no further synchronization against itself.
    pub async fn subscribe<T>(&self, channel: &str, handler: Arc<dyn EventHandler<T>>) -> Result<TopicSubscription>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let events = self.transport.subscribe(channel).await.context("error subscribing to topic channel")?;
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        tracing::debug!(channel, "topic subscription started");
        let handle = tokio::spawn(
            Subscription {
                channel: channel.to_string(),
                events,
                handler,
                _event: PhantomData,
            }
            .run(shutdown_rx),
        );
        Ok(TopicSubscription { shutdown, handle })
    }
}

/// A handle to a topic subscription.
pub struct TopicSubscription {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl TopicSubscription {
    /// Cancel this subscription and await its completion.
    pub async fn cancel(self) {
        let _res = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::error!(error = ?err, "error awaiting topic subscription shutdown");
        }
    }
}

struct Subscription<T> {
    channel: String,
    events: mpsc::Receiver<Bytes>,
    handler: Arc<dyn EventHandler<T>>,
    _event: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + Send + 'static> Subscription<T> {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                payload = self.events.recv() => match payload {
                    Some(payload) => self.handle_event(payload).await,
                    None => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!(channel = %self.channel, "topic subscription has shut down");
    }

    async fn handle_event(&self, payload: Bytes) {
        let event: T = match serde_json::from_slice(&payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(channel = %self.channel, error = ?err, "error decoding topic event, dropping");
                return;
            }
        };
        if let Err(err) = self.handler.handle(event).await {
            tracing::error!(channel = %self.channel, error = ?err, "error from topic event handler");
        }
    }
}
