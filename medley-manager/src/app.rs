use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::StreamExt;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, SignalStream};
use tokio_stream::StreamMap;

use medley_core::alloc::AllocateRequest;
use medley_core::load::ClusterEvent;
use medley_core::rpc::ALLOC_MEDIA;
use medley_core::{MANAGER_RPC_QUEUE, MEDIA_CLUSTER_CHANNEL};
use medley_mq::{EventHandler, MethodTable, NatsTransport, RpcServer, TopicClient, TopicSubscription, Transport};

use crate::config::Config;
use crate::placement::{policy_for, PlacementPolicy};
use crate::view::ClusterView;

/// The application object for when the manager is running as a server.
pub struct App {
    /// The application's runtime config.
    _config: Arc<Config>,
    /// The manager's aggregated view of cluster load.
    _view: Arc<Mutex<ClusterView>>,

    /// A channel used for triggering graceful shutdown.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,

    /// The cluster channel subscription feeding the view.
    load_sub: TopicSubscription,
    /// The allocation RPC server.
    rpc_server: RpcServer,
}

/// A cluster channel listener which folds load snapshots into the view.
pub struct LoadListener {
    view: Arc<Mutex<ClusterView>>,
}

impl LoadListener {
    pub fn new(view: Arc<Mutex<ClusterView>>) -> Self {
        Self { view }
    }
}

#[async_trait]
impl EventHandler<ClusterEvent> for LoadListener {
    async fn handle(&self, event: ClusterEvent) -> Result<()> {
        let ClusterEvent::Load(load) = event;
        self.view.lock().await.merge(load);
        Ok(())
    }
}

/// Build the manager's RPC method table over the given view and policy.
pub fn method_table(view: Arc<Mutex<ClusterView>>, policy: Arc<dyn PlacementPolicy>) -> MethodTable {
    MethodTable::new().register(ALLOC_MEDIA, move |body| {
        let view = view.clone();
        let policy = policy.clone();
        async move {
            let req: AllocateRequest = serde_json::from_value(body).context("error decoding allocation request")?;
            let allocation = view.lock().await.allocate(&req, policy.as_ref())?;
            tracing::info!(caller = %req.caller, kind = %req.kind, agent = %allocation.agent, worker = %allocation.worker, "media worker allocated");
            serde_json::to_value(allocation).context("error encoding allocation")
        }
    })
}

impl App {
    /// Create a new instance.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let (shutdown_tx, _) = broadcast::channel(100);
        let transport: Arc<dyn Transport> = Arc::new(NatsTransport::connect(&config.nats_url).await?);
        let view = Arc::new(Mutex::new(ClusterView::new()));

        let topic = TopicClient::new(transport.clone());
        let load_sub = topic
            .subscribe(MEDIA_CLUSTER_CHANNEL, Arc::new(LoadListener { view: view.clone() }))
            .await
            .context("error subscribing to cluster channel")?;

        let methods = method_table(view.clone(), policy_for(config.placement));
        let rpc_server = RpcServer::bind(transport, MANAGER_RPC_QUEUE, methods)
            .await
            .context("error binding allocation rpc server")?;

        Ok(Self {
            _config: config,
            _view: view,
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
            load_sub,
            rpc_server,
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
        tracing::debug!("cluster manager is shutting down");
        self.rpc_server.shutdown().await;
        self.load_sub.cancel().await;

        tracing::debug!("cluster manager shutdown complete");
        Ok(())
    }
}
