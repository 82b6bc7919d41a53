//! Bodies of the per-agent media RPCs.
//!
//! The media-specific payloads (`dtls`, `rtp`, capability descriptors,
//! transport descriptors) are opaque structured values delegated to the media
//! engine; only the routing fields are typed here. Calls are routed by the
//! caller using the `agent`/`worker` pair returned from allocation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `CREATE_SEND_TRANSPORT` and `CREATE_RECV_TRANSPORT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransportRequest {
    pub caller: String,
    pub worker: String,
}

/// Body of `CONNECT_TRANSPORT`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectTransportRequest {
    pub caller: String,
    pub worker: String,
    pub transport: String,
    pub dtls: Value,
}

/// Body of `CREATE_PRODUCER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProducerRequest {
    pub caller: String,
    pub worker: String,
    pub transport: String,
    /// Media kind ("audio"/"video"), opaque to the cluster core.
    pub kind: String,
    pub rtp: Value,
}

/// Body of `CREATE_CONSUMER`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsumerRequest {
    pub caller: String,
    pub worker: String,
    pub transport: String,
    /// The producer to consume.
    pub producer: String,
    pub rtp: Value,
    /// The agent hosting the producer being consumed.
    pub source_agent: String,
    /// The worker hosting the producer being consumed.
    pub source_worker: String,
}
