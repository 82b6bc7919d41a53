//! End-to-end allocation over the in-process transport: a load report flows
//! in on the cluster channel and an allocation flows out over RPC.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::sync::Mutex;

use medley_core::alloc::{AllocateRequest, Allocation};
use medley_core::load::{AgentLoad, ClusterEvent, SystemLoad, WorkerKind, WorkerLoad, WorkerReport};
use medley_core::rpc::ALLOC_MEDIA;
use medley_core::{RpcError, MANAGER_RPC_QUEUE, MEDIA_CLUSTER_CHANNEL};
use medley_mq::{MemoryTransport, RpcClient, RpcServer, TopicClient, Transport};

use super::app::{method_table, LoadListener};
use super::placement::policy_for;
use super::config::PlacementKind;
use super::view::ClusterView;

async fn harness(transport: Arc<dyn Transport>) -> Result<(RpcServer, medley_mq::TopicSubscription)> {
    let view = Arc::new(Mutex::new(ClusterView::new()));
    let topic = TopicClient::new(transport.clone());
    let sub = topic
        .subscribe(MEDIA_CLUSTER_CHANNEL, Arc::new(LoadListener::new(view.clone())))
        .await?;
    let server = RpcServer::bind(transport, MANAGER_RPC_QUEUE, method_table(view, policy_for(PlacementKind::FirstFit))).await?;
    Ok((server, sub))
}

#[tokio::test]
async fn load_report_then_allocation_round_trip() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let (server, sub) = harness(transport.clone()).await?;

    let topic = TopicClient::new(transport.clone());
    topic
        .publish(
            MEDIA_CLUSTER_CHANNEL,
            &ClusterEvent::Load(AgentLoad {
                agent: "media@a".into(),
                system: SystemLoad { cpu: 0.2, mem: 0.3 },
                workers: vec![WorkerReport::Full(WorkerLoad {
                    id: "w0".into(),
                    kind: WorkerKind::Producer,
                    capabilities: json!({ "codecs": ["vp8"] }),
                    conn: 0,
                    items: 0,
                })],
            }),
        )
        .await?;
    // Let the listener fold the report into the view.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = RpcClient::new(transport, Duration::from_secs(2)).await?;
    let allocation: Allocation = client
        .request(
            MANAGER_RPC_QUEUE,
            ALLOC_MEDIA,
            &AllocateRequest { caller: "portal@1".into(), kind: WorkerKind::Producer },
            None,
        )
        .await?;
    assert_eq!(allocation.agent, "media@a");
    assert_eq!(allocation.worker, "w0");
    assert_eq!(allocation.capabilities, json!({ "codecs": ["vp8"] }));

    server.shutdown().await;
    sub.cancel().await;
    Ok(())
}

#[tokio::test]
async fn allocation_against_an_empty_cluster_fails_remotely() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let (server, sub) = harness(transport.clone()).await?;

    let client = RpcClient::new(transport, Duration::from_secs(2)).await?;
    let res = client
        .request::<Allocation>(
            MANAGER_RPC_QUEUE,
            ALLOC_MEDIA,
            &AllocateRequest { caller: "portal@1".into(), kind: WorkerKind::Producer },
            None,
        )
        .await;
    match res {
        Err(RpcError::Remote(reason)) => assert_eq!(reason, "no agents in cluster view"),
        other => panic!("expected remote failure, got {:?}", other),
    }

    server.shutdown().await;
    sub.cancel().await;
    Ok(())
}
