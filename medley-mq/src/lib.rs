//! Broker transport binding and RPC layer for the Medley cluster.
//!
//! Everything in this crate speaks through the [`transport::Transport`]
//! seam: the RPC client/server pair implements correlation-tagged
//! request/response semantics over fire-and-forget sends, and the topic
//! client implements the broadcast channel used for cluster load telemetry.

pub mod client;
pub mod cluster;
pub mod memory;
pub mod nats;
pub mod server;
#[cfg(test)]
mod server_test;
pub mod topic;
#[cfg(test)]
mod topic_test;
pub mod transport;

pub use client::{RpcClient, DEFAULT_RPC_TIMEOUT};
pub use cluster::{ClusterMembership, ClusterWorker, LoadSource, DEFAULT_REPORT_INTERVAL};
pub use memory::MemoryTransport;
pub use nats::NatsTransport;
pub use server::{MethodTable, RpcServer};
pub use topic::{EventHandler, TopicClient, TopicSubscription};
pub use transport::{Delivery, MessageProperties, Transport};
