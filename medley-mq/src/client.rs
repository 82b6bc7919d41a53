//! RPC client.
//!
//! Issues correlation-tagged requests to a named server queue and suspends
//! the caller until the matching reply arrives on a private reply inbox, or
//! the per-call timeout fires, whichever comes first. Exactly one of the two
//! outcomes is observed; the loser finds the pending call already gone and
//! becomes a no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use medley_core::rpc::{RpcRequest, RpcResponse};
use medley_core::RpcError;

use crate::transport::{Delivery, MessageProperties, Transport};

/// The default per-call timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

type PendingTx = oneshot::Sender<Result<Value, RpcError>>;

/// An RPC client bound to a private reply inbox.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    reply_queue: String,
    default_timeout: Duration,
    state: Arc<Mutex<ClientState>>,
    consumer: JoinHandle<()>,
}

/// Mutable client state: the pending-call table and the correlation counter.
///
/// Correlation ids are a process-local monotonic u64. The original protocol
/// wrapped them at 65536, which can collide with a still-outstanding call; a
/// 64-bit counter makes the window larger than any plausible in-flight count
/// and removes the hazard.
struct ClientState {
    ready: bool,
    next_correlation_id: u64,
    pending: HashMap<u64, PendingTx>,
}

impl RpcClient {
    /// Create a new client: declares the ephemeral reply queue and starts
    /// consuming it. Fails if the transport has no usable channel.
    pub async fn new(transport: Arc<dyn Transport>, default_timeout: Duration) -> Result<Self, RpcError> {
        let reply_queue = transport.ephemeral_queue().await.map_err(RpcError::Transport)?;
        let deliveries = transport.consume(&reply_queue).await.map_err(RpcError::Transport)?;
        tracing::debug!(queue = %reply_queue, "rpc reply queue ready");

        let state = Arc::new(Mutex::new(ClientState {
            ready: true,
            next_correlation_id: 0,
            pending: HashMap::new(),
        }));
        let consumer = tokio::spawn(consume_replies(deliveries, state.clone()));
        Ok(Self {
            transport,
            reply_queue,
            default_timeout,
            state,
            consumer,
        })
    }

    /// Issue a request and decode the success payload into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self, target: &str, method: &str, body: &impl Serialize, timeout: Option<Duration>,
    ) -> Result<T, RpcError> {
        let body = serde_json::to_value(body).map_err(|err| RpcError::Decode(format!("error encoding request body: {}", err)))?;
        let data = self.request_value(target, method, body, timeout).await?;
        serde_json::from_value(data).map_err(|err| RpcError::Decode(err.to_string()))
    }

    /// Issue a request, suspending the caller until a matching reply arrives
    /// or the timeout fires.
    #[tracing::instrument(level = "debug", skip(self, body, timeout))]
    pub async fn request_value(&self, target: &str, method: &str, body: Value, timeout: Option<Duration>) -> Result<Value, RpcError> {
        let (correlation_id, reply_rx) = {
            let mut state = self.state.lock().await;
            if !state.ready {
                return Err(RpcError::NotReady);
            }
            let correlation_id = state.next_correlation_id;
            state.next_correlation_id += 1;
            let (tx, rx) = oneshot::channel();
            state.pending.insert(correlation_id, tx);
            (correlation_id, rx)
        };

        let payload = match serde_json::to_vec(&RpcRequest { method: method.into(), body }) {
            Ok(payload) => payload,
            Err(err) => {
                self.state.lock().await.pending.remove(&correlation_id);
                return Err(RpcError::Decode(format!("error encoding request: {}", err)));
            }
        };
        let props = MessageProperties {
            correlation_id: Some(correlation_id.to_string()),
            reply_to: Some(self.reply_queue.clone()),
        };
        if let Err(err) = self.transport.send(target, payload.into(), props).await {
            self.state.lock().await.pending.remove(&correlation_id);
            return Err(RpcError::Transport(err));
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            // The pending entry was dropped without a reply: close() path.
            Ok(Err(_dropped)) => Err(RpcError::Closed),
            Err(_elapsed) => {
                // Remove the pending call so a late reply becomes a no-op. If
                // the reply won the race, the entry is already gone.
                let timed_out = self.state.lock().await.pending.remove(&correlation_id).is_some();
                if timed_out {
                    tracing::warn!(correlation_id, target, method, "rpc request timed out");
                }
                Err(RpcError::Timeout)
            }
        }
    }

    /// Close the client: reject every outstanding call with `Closed`, stop
    /// consuming the reply queue, and refuse new requests. Idempotent.
    pub async fn close(&self) {
        let pending = {
            let mut state = self.state.lock().await;
            state.ready = false;
            std::mem::take(&mut state.pending)
        };
        for (correlation_id, tx) in pending {
            tracing::debug!(correlation_id, "rejecting in-flight rpc call on close");
            let _res = tx.send(Err(RpcError::Closed));
        }
        self.consumer.abort();
    }

    /// The name of this client's private reply queue.
    pub fn reply_queue(&self) -> &str {
        &self.reply_queue
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

/// Resolve pending calls as replies arrive on the reply queue.
async fn consume_replies(mut deliveries: mpsc::Receiver<Delivery>, state: Arc<Mutex<ClientState>>) {
    while let Some(delivery) = deliveries.recv().await {
        let correlation_id = match delivery.correlation_id.as_deref().and_then(|id| id.parse::<u64>().ok()) {
            Some(id) => id,
            None => {
                tracing::error!("reply without a usable correlation id, dropping");
                continue;
            }
        };
        // Decode before resolving: a malformed payload still resolves the
        // call (with a decode error) instead of leaving the caller hanging.
        let outcome = match serde_json::from_slice::<RpcResponse>(&delivery.payload) {
            Ok(RpcResponse::Ok(data)) => Ok(data),
            Ok(RpcResponse::Failure(reason)) => Err(RpcError::Remote(reason)),
            // A server must never send code 2; map it to the timeout outcome.
            Ok(RpcResponse::Timeout) => Err(RpcError::Timeout),
            Ok(RpcResponse::MethodNotAllowed) => Err(RpcError::MethodNotAllowed),
            Err(err) => Err(RpcError::Decode(err.to_string())),
        };
        let tx = state.lock().await.pending.remove(&correlation_id);
        match tx {
            Some(tx) => {
                // The receiver may have timed out between removal and send;
                // that race resolves to the timeout outcome and this send is
                // a no-op.
                let _res = tx.send(outcome);
            }
            None => tracing::warn!(correlation_id, "late rpc reply, pending call already resolved"),
        }
    }
}
