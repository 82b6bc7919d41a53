//! Cluster load snapshot model.
//!
//! Agents broadcast an [`AgentLoad`] snapshot on the cluster channel. The
//! first snapshot after a worker is created carries the full record with its
//! immutable identity fields; every later snapshot carries only the mutable
//! occupancy fields. Capability data therefore crosses the wire exactly once
//! per worker lifetime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of capability unit a media worker provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    Producer,
    Consumer,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// Host-level load of an agent process, both values in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    pub cpu: f64,
    pub mem: f64,
}

/// A full load record for one worker.
///
/// `kind` and `capabilities` are fixed at worker creation; `conn` and `items`
/// are the mutable occupancy counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerLoad {
    /// The worker's id, unique within its agent.
    pub id: String,
    pub kind: WorkerKind,
    /// The worker's routing capability descriptor, opaque to the cluster.
    pub capabilities: Value,
    /// Open transport connections.
    pub conn: u32,
    /// Producers or consumers hosted, depending on `kind`.
    pub items: u32,
}

/// The occupancy-only record sent for all reports after the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOccupancy {
    pub id: String,
    pub conn: u32,
    pub items: u32,
}

/// A per-worker entry of a load snapshot.
///
/// Untagged on the wire: a record carrying the identity fields is a full
/// record, anything else is an occupancy update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerReport {
    Full(WorkerLoad),
    Partial(WorkerOccupancy),
}

impl WorkerReport {
    /// The id of the worker this report describes.
    pub fn worker_id(&self) -> &str {
        match self {
            Self::Full(load) => &load.id,
            Self::Partial(occupancy) => &occupancy.id,
        }
    }
}

/// One agent's load snapshot as published on the cluster channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoad {
    /// The reporting agent's id, which is also its RPC queue name.
    pub agent: String,
    pub system: SystemLoad,
    pub workers: Vec<WorkerReport>,
}

/// The tagged payload broadcast on the cluster channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClusterEvent {
    Load(AgentLoad),
}
