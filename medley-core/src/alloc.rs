//! Allocation RPC types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::load::WorkerKind;

/// The body of an `ALLOC_MEDIA` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateRequest {
    /// The identity of the end caller the allocation is for.
    pub caller: String,
    /// The kind of worker requested.
    pub kind: WorkerKind,
}

/// A successful allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// The agent hosting the selected worker; also its RPC queue name.
    pub agent: String,
    /// The selected worker's id within the agent.
    pub worker: String,
    /// The worker's capability descriptor as stored at creation time.
    pub capabilities: Value,
}

/// Allocation failures. Both are recoverable: the caller may retry later or
/// surface a service-unavailable condition to its own caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocateError {
    /// The aggregated cluster view holds no agents at all.
    #[error("no agents in cluster view")]
    NoAgents,
    /// No worker of the requested kind exists anywhere in the view.
    #[error("no worker of requested kind")]
    NoMatchingWorker,
}
