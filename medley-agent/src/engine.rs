//! The media engine seam.
//!
//! The cluster protocol never looks inside a capability descriptor, transport
//! parameter set, or RTP payload; those are produced and consumed by the
//! engine behind these traits. The bundled [`StubEngine`] synthesizes
//! plausible descriptors, enough to run the full control plane without a
//! native media library on the host.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use medley_core::load::WorkerKind;

/// A media engine capable of spawning workers.
#[async_trait]
pub trait MediaEngine: Send + Sync + 'static {
    async fn create_worker(&self, id: &str, kind: WorkerKind) -> Result<Box<dyn MediaWorker>>;
}

/// The parameters of a newly created transport.
#[derive(Debug, Clone)]
pub struct TransportDescriptor {
    /// The engine-assigned transport id.
    pub id: String,
    /// The parameter set handed back to the caller for session negotiation.
    pub params: Value,
}

/// One media worker's engine handle.
#[async_trait]
pub trait MediaWorker: Send + Sync + 'static {
    /// The worker's routing capability descriptor, fixed for its lifetime.
    fn capabilities(&self) -> Value;

    /// Create a transport on this worker.
    async fn create_transport(&self) -> Result<TransportDescriptor>;

    /// Complete a transport's session negotiation with the remote parameters.
    async fn connect_transport(&self, transport: &str, dtls: Value) -> Result<()>;

    /// Attach a producer to a connected transport, returning its id.
    async fn create_producer(&self, transport: &str, kind: &str, rtp: Value) -> Result<String>;

    /// Attach a consumer of the given producer, returning its descriptor.
    async fn create_consumer(&self, transport: &str, producer: &str, rtp: Value) -> Result<TransportDescriptor>;
}

/// An engine with no media plane.
#[derive(Default)]
pub struct StubEngine;

#[async_trait]
impl MediaEngine for StubEngine {
    async fn create_worker(&self, id: &str, kind: WorkerKind) -> Result<Box<dyn MediaWorker>> {
        tracing::debug!(worker = id, kind = %kind, "stub media worker created");
        Ok(Box::new(StubWorker { worker: id.to_string() }))
    }
}

struct StubWorker {
    worker: String,
}

#[async_trait]
impl MediaWorker for StubWorker {
    fn capabilities(&self) -> Value {
        json!({
            "worker": self.worker,
            "codecs": ["opus", "vp8"],
        })
    }

    async fn create_transport(&self) -> Result<TransportDescriptor> {
        let id = Uuid::new_v4().to_string();
        let params = json!({
            "id": id,
            "iceParameters": { "usernameFragment": Uuid::new_v4().to_string() },
            "dtlsParameters": { "role": "auto" },
        });
        Ok(TransportDescriptor { id, params })
    }

    async fn connect_transport(&self, _transport: &str, _dtls: Value) -> Result<()> {
        Ok(())
    }

    async fn create_producer(&self, _transport: &str, _kind: &str, _rtp: Value) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn create_consumer(&self, _transport: &str, producer: &str, rtp: Value) -> Result<TransportDescriptor> {
        let id = Uuid::new_v4().to_string();
        let params = json!({
            "id": id,
            "producerId": producer,
            "rtpParameters": rtp,
        });
        Ok(TransportDescriptor { id, params })
    }
}
