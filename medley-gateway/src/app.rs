use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::prelude::*;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;

use medley_mq::{NatsTransport, RpcClient, Transport};

use crate::config::Config;
use crate::routes::{router, GatewayState};

/// The application object for when the gateway is running as a server.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,
    /// The shared HTTP state, holding the RPC client.
    state: Arc<GatewayState>,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The join handle of the HTTP server.
    http_server: JoinHandle<Result<()>>,
}

impl App {
    /// Create a new instance.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(100);
        let transport: Arc<dyn Transport> = Arc::new(NatsTransport::connect(&config.nats_url).await?);
        let client = RpcClient::new(transport, Duration::from_millis(config.rpc_timeout_ms))
            .await
            .context("error building rpc client")?;
        let state = Arc::new(GatewayState { client });

        let app = router(state.clone());
        let mut shutdown = shutdown_tx.subscribe();
        let server = axum::Server::bind(&([0, 0, 0, 0], config.http_port).into())
            .serve(app.into_make_service())
            .with_graceful_shutdown(async move {
                let _res = shutdown.recv().await;
            });
        tracing::info!("gateway is listening at 0.0.0.0:{}", config.http_port);
        let http_server = tokio::spawn(server.map_err(anyhow::Error::from));

        Ok(Self {
            _config: config,
            state,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            http_server,
        })
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        let mut signals = StreamMap::new();
        signals.insert("sigterm", SignalStream::new(signal(SignalKind::terminate()).context("error building signal stream")?));
        signals.insert("sigint", SignalStream::new(signal(SignalKind::interrupt()).context("error building signal stream")?));

        loop {
            tokio::select! {
                Some((_, sig)) = signals.next() => {
                    tracing::debug!(signal = ?sig, "signal received, beginning graceful shutdown");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = self.shutdown_rx.next() => break,
            }
        }

        // Begin shutdown routine.
        tracing::debug!("gateway is shutting down");
        if let Err(err) = self.http_server.await.context("error joining HTTP server handle").and_then(|res| res) {
            tracing::error!(error = ?err, "error shutting down HTTP server");
        }
        self.state.client.close().await;

        tracing::debug!("gateway shutdown complete");
        Ok(())
    }
}
