//! RPC server.
//!
//! Binds to a named queue, decodes request envelopes, dispatches to a
//! registered method table and replies to each request's reply destination
//! with a standard response envelope. Replies are fire-and-forget; the
//! server never waits on acknowledgment and holds no state of its own beyond
//! the table the embedder supplies.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use medley_core::rpc::{RpcRequest, RpcResponse};

use crate::transport::{Delivery, MessageProperties, Transport};

type MethodFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// The table of methods a server dispatches to.
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: BTreeMap<String, MethodFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the given method name.
    ///
    /// A handler's `Ok` value becomes a code 0 reply; its `Err` becomes a
    /// code 1 reply carrying the error's display string.
    pub fn register<F, Fut>(mut self, method: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        self.methods.insert(method.to_string(), Arc::new(move |body| handler(body).boxed()));
        self
    }

    fn get(&self, method: &str) -> Option<MethodFn> {
        self.methods.get(method).cloned()
    }
}

/// A handle to a running RPC server.
pub struct RpcServer {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl RpcServer {
    /// Bind a server to the given queue with the given method table.
    pub async fn bind(transport: Arc<dyn Transport>, queue: &str, methods: MethodTable) -> Result<Self> {
        let deliveries = transport.consume(queue).await.context("error consuming rpc request queue")?;
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        tracing::debug!(queue, "rpc server bound");
        let handle = tokio::spawn(serve(transport, methods, deliveries, shutdown_rx));
        Ok(Self { shutdown, handle })
    }

    /// Stop serving and await completion of the accept loop.
    pub async fn shutdown(self) {
        let _res = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::error!(error = ?err, "error awaiting rpc server shutdown");
        }
    }
}

async fn serve(transport: Arc<dyn Transport>, methods: MethodTable, mut deliveries: mpsc::Receiver<Delivery>, mut shutdown: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            delivery = deliveries.recv() => match delivery {
                // Handlers run concurrently, one task per request.
                Some(delivery) => {
                    tokio::spawn(handle_delivery(transport.clone(), methods.clone(), delivery));
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("rpc server has shut down");
}

#[tracing::instrument(level = "debug", skip(transport, methods, delivery))]
async fn handle_delivery(transport: Arc<dyn Transport>, methods: MethodTable, delivery: Delivery) {
    let request: RpcRequest = match serde_json::from_slice(&delivery.payload) {
        Ok(request) => request,
        Err(err) => {
            tracing::error!(error = ?err, "error decoding rpc request, dropping");
            return;
        }
    };

    let response = match methods.get(&request.method) {
        Some(handler) => match handler(request.body).await {
            Ok(data) => RpcResponse::Ok(data),
            Err(err) => {
                tracing::warn!(method = %request.method, error = ?err, "rpc method returned a failure");
                RpcResponse::failure(err)
            }
        },
        None => {
            tracing::warn!(method = %request.method, "unknown rpc method requested");
            RpcResponse::MethodNotAllowed
        }
    };

    let reply_to = match delivery.reply_to {
        Some(reply_to) => reply_to,
        None => {
            tracing::debug!(method = %request.method, "request carried no reply destination, reply skipped");
            return;
        }
    };
    let payload = match serde_json::to_vec(&response) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = ?err, "error encoding rpc response");
            return;
        }
    };
    let props = MessageProperties {
        correlation_id: delivery.correlation_id,
        reply_to: None,
    };
    if let Err(err) = transport.send(&reply_to, payload.into(), props).await {
        tracing::error!(error = ?err, "error sending rpc response");
    }
}
