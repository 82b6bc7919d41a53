//! The message transport seam.
//!
//! The broker is an injected collaborator: the RPC and topic layers only
//! require point-to-point send-to-named-queue with an ephemeral reply inbox,
//! plus topic publish/subscribe. All primitives are fire-and-forget with
//! at-most-once, best-effort delivery; no ordering is assumed anywhere above
//! this seam.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Transport-level metadata attached to a queue send.
///
/// These travel out-of-band as message properties, never inside the payload.
#[derive(Debug, Clone, Default)]
pub struct MessageProperties {
    /// Opaque token linking a reply to its originating request.
    pub correlation_id: Option<String>,
    /// The destination the receiver should reply to.
    pub reply_to: Option<String>,
}

/// A message delivered from a consumed queue.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Bytes,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

/// A minimal broker binding.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a payload to a named queue, fire-and-forget.
    async fn send(&self, queue: &str, payload: Bytes, props: MessageProperties) -> Result<()>;

    /// Create a private, auto-reclaimed inbox scoped to the caller.
    async fn ephemeral_queue(&self) -> Result<String>;

    /// Consume deliveries from the given queue.
    ///
    /// Deliveries with distinct correlation ids carry no ordering guarantee
    /// relative to each other. Dropping the receiver ends consumption.
    async fn consume(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>>;

    /// Broadcast a payload on a named topic channel.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<()>;

    /// Subscribe to a named topic channel.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Bytes>>;
}
