//! The manager's view of cluster load.
//!
//! The view is built purely from load snapshots broadcast on the cluster
//! channel. Agents and workers are kept in first-report order so that
//! placement over the view is deterministic. There is no eviction here:
//! detecting and expiring dead agents is an operator concern handled outside
//! this process.

use medley_core::alloc::{AllocateError, AllocateRequest, Allocation};
use medley_core::load::{AgentLoad, SystemLoad, WorkerLoad, WorkerReport};

use crate::placement::{Candidate, PlacementPolicy};

/// One agent's entry in the cluster view.
#[derive(Debug, Clone)]
pub struct AgentEntry {
    pub agent: String,
    pub system: SystemLoad,
    pub workers: Vec<WorkerLoad>,
}

/// The aggregated view of every reporting agent.
#[derive(Debug, Clone, Default)]
pub struct ClusterView {
    agents: Vec<AgentEntry>,
}

impl ClusterView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one load snapshot into the view.
    ///
    /// A full worker record creates the worker or replaces its record
    /// wholesale; an occupancy record updates the counters of a known worker
    /// in place. An occupancy record for an unknown worker is dropped, as its
    /// identity fields will arrive with the agent's next full report.
    pub fn merge(&mut self, load: AgentLoad) {
        let idx = match self.agents.iter().position(|entry| entry.agent == load.agent) {
            Some(idx) => idx,
            None => {
                tracing::info!(agent = %load.agent, "new agent joined the cluster view");
                self.agents.push(AgentEntry {
                    agent: load.agent.clone(),
                    system: load.system,
                    workers: Vec::new(),
                });
                self.agents.len() - 1
            }
        };
        let entry = &mut self.agents[idx];
        entry.system = load.system;
        for report in load.workers {
            let pos = entry.workers.iter().position(|known| known.id == report.worker_id());
            match (report, pos) {
                (WorkerReport::Full(worker), Some(pos)) => entry.workers[pos] = worker,
                (WorkerReport::Full(worker), None) => entry.workers.push(worker),
                (WorkerReport::Partial(occupancy), Some(pos)) => {
                    entry.workers[pos].conn = occupancy.conn;
                    entry.workers[pos].items = occupancy.items;
                }
                (WorkerReport::Partial(occupancy), None) => {
                    tracing::debug!(agent = %entry.agent, worker = %occupancy.id, "occupancy update for unknown worker, dropping");
                }
            }
        }
    }

    /// Allocate a worker for the given request under the given policy.
    pub fn allocate(&self, req: &AllocateRequest, policy: &dyn PlacementPolicy) -> Result<Allocation, AllocateError> {
        if self.agents.is_empty() {
            return Err(AllocateError::NoAgents);
        }
        let candidates: Vec<Candidate> = self
            .agents
            .iter()
            .flat_map(|entry| {
                entry
                    .workers
                    .iter()
                    .filter(|worker| worker.kind == req.kind)
                    .map(move |worker| Candidate { agent: &entry.agent, worker })
            })
            .collect();
        let picked = policy.pick(&candidates).ok_or(AllocateError::NoMatchingWorker)?;
        Ok(Allocation {
            agent: picked.agent.to_string(),
            worker: picked.worker.id.clone(),
            capabilities: picked.worker.capabilities.clone(),
        })
    }

    /// The agents currently known to the view.
    pub fn agents(&self) -> &[AgentEntry] {
        &self.agents
    }
}
