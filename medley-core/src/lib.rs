//! Shared types for the Medley media-relay cluster.

pub mod alloc;
pub mod error;
pub mod load;
#[cfg(test)]
mod load_test;
pub mod media;
pub mod rpc;
#[cfg(test)]
mod rpc_test;

pub use alloc::{AllocateError, AllocateRequest, Allocation};
pub use error::RpcError;
pub use load::{AgentLoad, ClusterEvent, SystemLoad, WorkerKind, WorkerLoad, WorkerOccupancy, WorkerReport};
pub use rpc::{RpcRequest, RpcResponse};

/// The well-known RPC queue of the cluster manager.
pub const MANAGER_RPC_QUEUE: &str = "rpc.cluster-manager";
/// The well-known topic channel on which media agents report load.
pub const MEDIA_CLUSTER_CHANNEL: &str = "cluster.media";
