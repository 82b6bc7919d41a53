//! Placement strategies for media allocation.

use std::sync::Arc;

use medley_core::load::WorkerLoad;

use crate::config::PlacementKind;

/// One worker eligible for an allocation, paired with its hosting agent.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub agent: &'a str,
    pub worker: &'a WorkerLoad,
}

/// A strategy for picking one worker out of the eligible candidates.
///
/// Candidates arrive filtered to the requested kind, ordered by agent and
/// worker first-report order.
pub trait PlacementPolicy: Send + Sync + 'static {
    fn pick<'a>(&self, candidates: &[Candidate<'a>]) -> Option<Candidate<'a>>;
}

/// Take the first eligible worker.
///
/// Concentrates load on the earliest-reporting agents, which keeps the rest
/// of the cluster idle for draining or scale-down.
pub struct FirstFit;

impl PlacementPolicy for FirstFit {
    fn pick<'a>(&self, candidates: &[Candidate<'a>]) -> Option<Candidate<'a>> {
        candidates.first().copied()
    }
}

/// Take the eligible worker with the lowest occupancy, connections first and
/// hosted items as the tie-breaker.
pub struct LeastOccupied;

impl PlacementPolicy for LeastOccupied {
    fn pick<'a>(&self, candidates: &[Candidate<'a>]) -> Option<Candidate<'a>> {
        candidates.iter().min_by_key(|candidate| (candidate.worker.conn, candidate.worker.items)).copied()
    }
}

/// Build the configured policy.
pub fn policy_for(kind: PlacementKind) -> Arc<dyn PlacementPolicy> {
    match kind {
        PlacementKind::FirstFit => Arc::new(FirstFit),
        PlacementKind::LeastOccupied => Arc::new(LeastOccupied),
    }
}
