//! Cluster membership via periodic load broadcast.
//!
//! A worker joins the cluster by announcing a full load report on the cluster
//! channel, then keeps its membership alive by broadcasting partial reports
//! on a fixed interval. Listeners that miss the full report pick the worker
//! up on the next full one; there is no handshake and no acknowledgment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use medley_core::load::{AgentLoad, ClusterEvent};

use crate::topic::TopicClient;

/// The default interval between load reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_millis(3000);

/// A source of load reports for cluster broadcast.
///
/// `first` is true for the initial report of a membership, which must carry
/// the full worker descriptions; later reports may carry occupancy only.
#[async_trait]
pub trait LoadSource: Send + Sync + 'static {
    async fn load(&self, first: bool) -> Result<AgentLoad>;
}

/// A worker process's membership reporter.
pub struct ClusterWorker {
    channel: String,
    topic: TopicClient,
    source: Arc<dyn LoadSource>,
    interval: Duration,
}

impl ClusterWorker {
    pub fn new(channel: &str, topic: TopicClient, source: Arc<dyn LoadSource>, interval: Duration) -> Self {
        Self {
            channel: channel.to_string(),
            topic,
            source,
            interval,
        }
    }

    /// Join the cluster: broadcast the initial full report immediately, then
    /// broadcast follow-up reports every interval until cancelled.
    pub fn join(self) -> ClusterMembership {
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(self.run(shutdown_rx));
        ClusterMembership { shutdown, handle }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        self.report(true).await;
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // the first tick resolves immediately
        loop {
            tokio::select! {
                _ = interval.tick() => self.report(false).await,
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!(channel = %self.channel, "cluster membership has shut down");
    }

    async fn report(&self, first: bool) {
        let load = match self.source.load(first).await {
            Ok(load) => load,
            Err(err) => {
                tracing::error!(error = ?err, "error sampling load for cluster report");
                return; // skip this cycle, the next interval retries
            }
        };
        if let Err(err) = self.topic.publish(&self.channel, &ClusterEvent::Load(load)).await {
            tracing::error!(error = ?err, "error broadcasting cluster load report");
        }
    }
}

/// A handle to an active cluster membership.
pub struct ClusterMembership {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl ClusterMembership {
    /// Leave the cluster: stop reporting and await the reporter's completion.
    pub async fn leave(self) {
        let _res = self.shutdown.send(());
        if let Err(err) = self.handle.await {
            tracing::error!(error = ?err, "error awaiting cluster membership shutdown");
        }
    }
}
