use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;
use uuid::Uuid;

use medley_core::load::AgentLoad;
use medley_core::MEDIA_CLUSTER_CHANNEL;
use medley_mq::{ClusterMembership, ClusterWorker, LoadSource, NatsTransport, RpcServer, TopicClient, Transport};

use crate::config::Config;
use crate::engine::StubEngine;
use crate::registry::{method_table, WorkerRegistry};
use crate::sys;

/// The application object for when the agent is running as a server.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,
    /// The agent's identity, which is also its RPC queue name.
    identity: String,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The media RPC server.
    rpc_server: RpcServer,
    /// The cluster membership reporter.
    membership: ClusterMembership,
}

/// The agent's load source: host load plus registry occupancy.
struct AgentSource {
    identity: String,
    registry: Arc<Mutex<WorkerRegistry>>,
}

#[async_trait]
impl LoadSource for AgentSource {
    async fn load(&self, first: bool) -> Result<AgentLoad> {
        let system = sys::sample()?;
        let workers = self.registry.lock().await.snapshot(first);
        Ok(AgentLoad { agent: self.identity.clone(), system, workers })
    }
}

impl App {
    /// Create a new instance.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(100);
        let identity = format!("media@{}", Uuid::new_v4());
        let transport: Arc<dyn Transport> = Arc::new(NatsTransport::connect(&config.nats_url).await?);

        let registry = WorkerRegistry::build(&StubEngine, config.worker_num, config.producer_worker_num)
            .await
            .context("error building worker registry")?;
        let registry = Arc::new(Mutex::new(registry));

        let rpc_server = RpcServer::bind(transport.clone(), &identity, method_table(registry.clone()))
            .await
            .context("error binding media rpc server")?;

        let source = Arc::new(AgentSource { identity: identity.clone(), registry });
        let membership = ClusterWorker::new(
            MEDIA_CLUSTER_CHANNEL,
            TopicClient::new(transport),
            source,
            Duration::from_millis(config.report_interval_ms),
        )
        .join();
        tracing::info!(identity = %identity, "media agent joined the cluster");

        Ok(Self {
            _config: config,
            identity,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            rpc_server,
            membership,
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
        tracing::debug!(identity = %self.identity, "media agent is shutting down");
        self.membership.leave().await;
        self.rpc_server.shutdown().await;

        tracing::debug!("media agent shutdown complete");
        Ok(())
    }
}
