//! NATS core binding for the transport seam.
//!
//! Queue names map to subjects, the ephemeral reply destination is a NATS
//! inbox, the reply destination rides on the native reply subject, and the
//! correlation id rides in a message header. Topics use plain core pub/sub,
//! which matches the at-most-once contract of the seam.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::sync::mpsc;

use crate::transport::{Delivery, MessageProperties, Transport};

/// The header carrying the correlation id of an RPC message.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

const DELIVERY_BUFFER: usize = 64;

/// A [`Transport`] backed by a NATS core connection.
#[derive(Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    /// Connect to the NATS server at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url).await.context("error connecting to NATS")?;
        Ok(Self { client })
    }

    /// Wrap an already established NATS connection.
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn send(&self, queue: &str, payload: Bytes, props: MessageProperties) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        if let Some(correlation_id) = props.correlation_id.as_deref() {
            headers.insert(CORRELATION_ID_HEADER, correlation_id);
        }
        match props.reply_to {
            Some(reply_to) => self
                .client
                .publish_with_reply_and_headers(queue.to_string(), reply_to, headers, payload)
                .await
                .context("error sending message to queue")?,
            None => self
                .client
                .publish_with_headers(queue.to_string(), headers, payload)
                .await
                .context("error sending message to queue")?,
        }
        Ok(())
    }

    async fn ephemeral_queue(&self) -> Result<String> {
        Ok(self.client.new_inbox())
    }

    async fn consume(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>> {
        let mut sub = self.client.subscribe(queue.to_string()).await.context("error subscribing to queue")?;
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        tokio::spawn(async move {
            while let Some(msg) = sub.next().await {
                let correlation_id = msg
                    .headers
                    .as_ref()
                    .and_then(|headers| headers.get(CORRELATION_ID_HEADER))
                    .map(|val| val.as_str().to_string());
                let delivery = Delivery {
                    payload: msg.payload,
                    correlation_id,
                    reply_to: msg.reply.map(|subject| subject.to_string()),
                };
                if tx.send(delivery).await.is_err() {
                    break; // consumer gone, unsubscribe via drop
                }
            }
        });
        Ok(rx)
    }

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(channel.to_string(), payload)
            .await
            .context("error publishing to topic channel")
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Bytes>> {
        let mut sub = self.client.subscribe(channel.to_string()).await.context("error subscribing to topic channel")?;
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        tokio::spawn(async move {
            while let Some(msg) = sub.next().await {
                if tx.send(msg.payload).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
