use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::memory::MemoryTransport;
use crate::topic::{EventHandler, TopicClient};
use crate::transport::Transport;

const TEST_CHANNEL: &str = "cluster.test";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ping {
    seq: u32,
}

struct Collector {
    tx: mpsc::UnboundedSender<Ping>,
}

#[async_trait]
impl EventHandler<Ping> for Collector {
    async fn handle(&self, event: Ping) -> Result<()> {
        self.tx.send(event)?;
        Ok(())
    }
}

fn collector() -> (Arc<Collector>, mpsc::UnboundedReceiver<Ping>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Collector { tx }), rx)
}

#[tokio::test]
async fn published_events_reach_a_typed_subscriber() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let topic = TopicClient::new(transport);
    let (handler, mut rx) = collector();
    let sub = topic.subscribe(TEST_CHANNEL, handler).await?;

    for seq in 0..3u32 {
        topic.publish(TEST_CHANNEL, &Ping { seq }).await?;
    }
    for seq in 0..3u32 {
        let event = rx.recv().await.expect("subscriber channel closed early");
        assert_eq!(event, Ping { seq });
    }

    sub.cancel().await;
    Ok(())
}

#[tokio::test]
async fn every_subscriber_receives_each_event() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let topic = TopicClient::new(transport);
    let (handler_a, mut rx_a) = collector();
    let (handler_b, mut rx_b) = collector();
    let sub_a = topic.subscribe(TEST_CHANNEL, handler_a).await?;
    let sub_b = topic.subscribe(TEST_CHANNEL, handler_b).await?;

    topic.publish(TEST_CHANNEL, &Ping { seq: 7 }).await?;
    assert_eq!(rx_a.recv().await, Some(Ping { seq: 7 }));
    assert_eq!(rx_b.recv().await, Some(Ping { seq: 7 }));

    sub_a.cancel().await;
    sub_b.cancel().await;
    Ok(())
}

#[tokio::test]
async fn cancelled_subscription_stops_delivering() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let topic = TopicClient::new(transport);
    let (handler, mut rx) = collector();
    let sub = topic.subscribe(TEST_CHANNEL, handler).await?;
    sub.cancel().await;

    topic.publish(TEST_CHANNEL, &Ping { seq: 1 }).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "event delivered after cancel");
    Ok(())
}

#[tokio::test]
async fn undecodable_event_is_dropped_without_stopping_delivery() -> Result<()> {
    let transport = MemoryTransport::new();
    let topic = TopicClient::new(Arc::new(transport.clone()));
    let (handler, mut rx) = collector();
    let sub = topic.subscribe(TEST_CHANNEL, handler).await?;

    transport.publish(TEST_CHANNEL, "not a ping".into()).await?;
    topic.publish(TEST_CHANNEL, &Ping { seq: 2 }).await?;
    assert_eq!(rx.recv().await, Some(Ping { seq: 2 }));

    sub.cancel().await;
    Ok(())
}
