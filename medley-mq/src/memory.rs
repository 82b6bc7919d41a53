//! In-process transport used by the test suites and local development.
//!
//! Faithful to the delivery contract of the seam: a send to a queue with no
//! live consumer is silently dropped (at-most-once, best-effort), and topic
//! publishes reach only the subscribers present at publish time.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, Mutex};
use uuid::Uuid;

use crate::transport::{Delivery, MessageProperties, Transport};

const QUEUE_BUFFER: usize = 64;

/// An in-process broker implementing the [`Transport`] seam.
///
/// Clones share the same broker state, so handing clones to multiple
/// components wires them together.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    queues: HashMap<String, mpsc::Sender<Delivery>>,
    topics: HashMap<String, broadcast::Sender<Bytes>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, queue: &str, payload: Bytes, props: MessageProperties) -> Result<()> {
        let tx = self.inner.lock().await.queues.get(queue).cloned();
        let tx = match tx {
            Some(tx) => tx,
            None => return Ok(()), // no consumer bound, message dropped
        };
        let delivery = Delivery {
            payload,
            correlation_id: props.correlation_id,
            reply_to: props.reply_to,
        };
        if tx.send(delivery).await.is_err() {
            // Consumer went away; reclaim the queue entry.
            self.inner.lock().await.queues.remove(queue);
        }
        Ok(())
    }

    async fn ephemeral_queue(&self) -> Result<String> {
        Ok(format!("inbox.{}", Uuid::new_v4()))
    }

    async fn consume(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>> {
        let (tx, rx) = mpsc::channel(QUEUE_BUFFER);
        self.inner.lock().await.queues.insert(queue.to_string(), tx);
        Ok(rx)
    }

    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()> {
        let tx = self.inner.lock().await.topics.get(channel).cloned();
        if let Some(tx) = tx {
            let _res = tx.send(payload); // no subscribers is not an error
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Bytes>> {
        let mut sub = {
            let mut inner = self.inner.lock().await;
            inner
                .topics
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(QUEUE_BUFFER).0)
                .subscribe()
        };
        let (tx, rx) = mpsc::channel(QUEUE_BUFFER);
        tokio::spawn(async move {
            loop {
                match sub.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "topic subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(rx)
    }
}
