//! The agent's worker registry and its RPC surface.
//!
//! The registry owns the engine workers and the bookkeeping the cluster
//! cares about: which transports exist per worker, which producers and
//! consumers they host, and the occupancy counters derived from them. Every
//! RPC the agent serves funnels through here.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use medley_core::load::{WorkerKind, WorkerLoad, WorkerOccupancy, WorkerReport};
use medley_core::media::{ConnectTransportRequest, CreateConsumerRequest, CreateProducerRequest, CreateTransportRequest};
use medley_core::rpc::{CONNECT_TRANSPORT, CREATE_CONSUMER, CREATE_PRODUCER, CREATE_RECV_TRANSPORT, CREATE_SEND_TRANSPORT};
use medley_mq::MethodTable;

use crate::engine::{MediaEngine, MediaWorker};

struct TransportState {
    caller: String,
    connected: bool,
}

struct WorkerSlot {
    id: String,
    kind: WorkerKind,
    worker: Box<dyn MediaWorker>,
    transports: HashMap<String, TransportState>,
    producers: HashSet<String>,
    consumers: HashSet<String>,
}

/// The set of media workers this agent hosts.
pub struct WorkerRegistry {
    workers: Vec<WorkerSlot>,
}

impl WorkerRegistry {
    /// Build the registry: the first `producer_num` workers handle the
    /// producer side, the rest handle the consumer side.
    pub async fn build(engine: &dyn MediaEngine, worker_num: usize, producer_num: usize) -> Result<Self> {
        let mut workers = Vec::with_capacity(worker_num);
        for idx in 0..worker_num {
            let id = format!("w{}", idx);
            let kind = if idx < producer_num { WorkerKind::Producer } else { WorkerKind::Consumer };
            let worker = engine.create_worker(&id, kind).await.context("error creating media worker")?;
            workers.push(WorkerSlot {
                id,
                kind,
                worker,
                transports: HashMap::new(),
                producers: HashSet::new(),
                consumers: HashSet::new(),
            });
        }
        Ok(Self { workers })
    }

    /// Snapshot worker load for a cluster report.
    pub fn snapshot(&self, full: bool) -> Vec<WorkerReport> {
        self.workers
            .iter()
            .map(|slot| {
                let conn = slot.transports.len() as u32;
                let items = match slot.kind {
                    WorkerKind::Producer => slot.producers.len() as u32,
                    WorkerKind::Consumer => slot.consumers.len() as u32,
                };
                if full {
                    WorkerReport::Full(WorkerLoad {
                        id: slot.id.clone(),
                        kind: slot.kind,
                        capabilities: slot.worker.capabilities(),
                        conn,
                        items,
                    })
                } else {
                    WorkerReport::Partial(WorkerOccupancy { id: slot.id.clone(), conn, items })
                }
            })
            .collect()
    }

    pub async fn create_send_transport(&mut self, req: CreateTransportRequest) -> Result<Value> {
        self.create_transport(req, WorkerKind::Producer).await
    }

    pub async fn create_recv_transport(&mut self, req: CreateTransportRequest) -> Result<Value> {
        self.create_transport(req, WorkerKind::Consumer).await
    }

    async fn create_transport(&mut self, req: CreateTransportRequest, kind: WorkerKind) -> Result<Value> {
        let slot = self.slot_mut(&req.worker)?;
        if slot.kind != kind {
            bail!("wrong worker kind: {}", slot.id);
        }
        let desc = slot.worker.create_transport().await?;
        slot.transports.insert(desc.id.clone(), TransportState { caller: req.caller, connected: false });
        tracing::debug!(worker = %slot.id, transport = %desc.id, "transport created");
        Ok(desc.params)
    }

    pub async fn connect_transport(&mut self, req: ConnectTransportRequest) -> Result<Value> {
        let slot = self.slot_mut(&req.worker)?;
        if !slot.transports.contains_key(&req.transport) {
            bail!("no such transport: {}", req.transport);
        }
        slot.worker.connect_transport(&req.transport, req.dtls).await?;
        if let Some(state) = slot.transports.get_mut(&req.transport) {
            state.connected = true;
            tracing::debug!(worker = %slot.id, transport = %req.transport, caller = %state.caller, "transport connected");
        }
        Ok(Value::Null)
    }

    pub async fn create_producer(&mut self, req: CreateProducerRequest) -> Result<Value> {
        let slot = self.slot_mut(&req.worker)?;
        if slot.kind != WorkerKind::Producer {
            bail!("wrong worker kind: {}", slot.id);
        }
        check_connected(slot, &req.transport)?;
        let producer = slot.worker.create_producer(&req.transport, &req.kind, req.rtp).await?;
        slot.producers.insert(producer.clone());
        tracing::debug!(worker = %slot.id, producer = %producer, "producer created");
        Ok(json!({ "producer": producer }))
    }

    pub async fn create_consumer(&mut self, req: CreateConsumerRequest) -> Result<Value> {
        let slot = self.slot_mut(&req.worker)?;
        if slot.kind != WorkerKind::Consumer {
            bail!("wrong worker kind: {}", slot.id);
        }
        check_connected(slot, &req.transport)?;
        let desc = slot.worker.create_consumer(&req.transport, &req.producer, req.rtp).await?;
        slot.consumers.insert(desc.id.clone());
        tracing::debug!(
            worker = %slot.id, consumer = %desc.id, producer = %req.producer,
            source_agent = %req.source_agent, source_worker = %req.source_worker,
            "consumer created",
        );
        Ok(desc.params)
    }

    fn slot_mut(&mut self, worker: &str) -> Result<&mut WorkerSlot> {
        match self.workers.iter_mut().find(|slot| slot.id == worker) {
            Some(slot) => Ok(slot),
            None => bail!("worker not ready: {}", worker),
        }
    }
}

fn check_connected(slot: &WorkerSlot, transport: &str) -> Result<()> {
    match slot.transports.get(transport) {
        Some(state) if state.connected => Ok(()),
        Some(_) => bail!("transport not connected: {}", transport),
        None => bail!("no such transport: {}", transport),
    }
}

/// Build the agent's RPC method table over the given registry.
pub fn method_table(registry: Arc<Mutex<WorkerRegistry>>) -> MethodTable {
    let send = registry.clone();
    let recv = registry.clone();
    let connect = registry.clone();
    let producer = registry.clone();
    let consumer = registry;
    MethodTable::new()
        .register(CREATE_SEND_TRANSPORT, move |body| {
            let registry = send.clone();
            async move {
                let req: CreateTransportRequest = serde_json::from_value(body).context("error decoding transport request")?;
                registry.lock().await.create_send_transport(req).await
            }
        })
        .register(CREATE_RECV_TRANSPORT, move |body| {
            let registry = recv.clone();
            async move {
                let req: CreateTransportRequest = serde_json::from_value(body).context("error decoding transport request")?;
                registry.lock().await.create_recv_transport(req).await
            }
        })
        .register(CONNECT_TRANSPORT, move |body| {
            let registry = connect.clone();
            async move {
                let req: ConnectTransportRequest = serde_json::from_value(body).context("error decoding connect request")?;
                registry.lock().await.connect_transport(req).await
            }
        })
        .register(CREATE_PRODUCER, move |body| {
            let registry = producer.clone();
            async move {
                let req: CreateProducerRequest = serde_json::from_value(body).context("error decoding producer request")?;
                registry.lock().await.create_producer(req).await
            }
        })
        .register(CREATE_CONSUMER, move |body| {
            let registry = consumer.clone();
            async move {
                let req: CreateConsumerRequest = serde_json::from_value(body).context("error decoding consumer request")?;
                registry.lock().await.create_consumer(req).await
            }
        })
}
