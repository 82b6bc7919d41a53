//! HTTP surface of the gateway.
//!
//! Each route is a thin forwarder: decode the body, relay it over RPC to the
//! manager or to the agent named in the body, and map the RPC outcome onto an
//! HTTP status. The gateway holds no session state; callers identify
//! themselves in the request body.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{AddExtensionLayer, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use medley_core::alloc::AllocateRequest;
use medley_core::media::{ConnectTransportRequest, CreateConsumerRequest, CreateProducerRequest, CreateTransportRequest};
use medley_core::rpc::{ALLOC_MEDIA, CONNECT_TRANSPORT, CREATE_CONSUMER, CREATE_PRODUCER, CREATE_RECV_TRANSPORT, CREATE_SEND_TRANSPORT};
use medley_core::{RpcError, MANAGER_RPC_QUEUE};
use medley_mq::RpcClient;

/// Shared state of the HTTP surface.
pub struct GatewayState {
    pub client: RpcClient,
}

/// A media RPC body paired with the agent to route it to.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaCall<T> {
    /// The agent hosting the target worker, from a prior allocation.
    pub agent: String,
    #[serde(flatten)]
    pub body: T,
}

/// Build the gateway's router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/v1/allocate", post(allocate))
        .route("/v1/transports/send", post(create_send_transport))
        .route("/v1/transports/recv", post(create_recv_transport))
        .route("/v1/transports/connect", post(connect_transport))
        .route("/v1/producers", post(create_producer))
        .route("/v1/consumers", post(create_consumer))
        .layer(AddExtensionLayer::new(state))
}

async fn allocate(Extension(state): Extension<Arc<GatewayState>>, Json(body): Json<AllocateRequest>) -> (StatusCode, Json<Value>) {
    respond(state.client.request(MANAGER_RPC_QUEUE, ALLOC_MEDIA, &body, None).await)
}

async fn create_send_transport(
    Extension(state): Extension<Arc<GatewayState>>, Json(call): Json<MediaCall<CreateTransportRequest>>,
) -> (StatusCode, Json<Value>) {
    forward(&state, call, CREATE_SEND_TRANSPORT).await
}

async fn create_recv_transport(
    Extension(state): Extension<Arc<GatewayState>>, Json(call): Json<MediaCall<CreateTransportRequest>>,
) -> (StatusCode, Json<Value>) {
    forward(&state, call, CREATE_RECV_TRANSPORT).await
}

async fn connect_transport(
    Extension(state): Extension<Arc<GatewayState>>, Json(call): Json<MediaCall<ConnectTransportRequest>>,
) -> (StatusCode, Json<Value>) {
    forward(&state, call, CONNECT_TRANSPORT).await
}

async fn create_producer(
    Extension(state): Extension<Arc<GatewayState>>, Json(call): Json<MediaCall<CreateProducerRequest>>,
) -> (StatusCode, Json<Value>) {
    forward(&state, call, CREATE_PRODUCER).await
}

async fn create_consumer(
    Extension(state): Extension<Arc<GatewayState>>, Json(call): Json<MediaCall<CreateConsumerRequest>>,
) -> (StatusCode, Json<Value>) {
    forward(&state, call, CREATE_CONSUMER).await
}

async fn forward<T: Serialize>(state: &GatewayState, call: MediaCall<T>, method: &str) -> (StatusCode, Json<Value>) {
    respond(state.client.request(&call.agent, method, &call.body, None).await)
}

fn respond(res: Result<Value, RpcError>) -> (StatusCode, Json<Value>) {
    match res {
        Ok(data) => (StatusCode::OK, Json(data)),
        Err(err) => {
            // An unanswered call hints at cluster trouble; a remote refusal
            // is ordinary application flow.
            if err.is_unanswered() {
                tracing::warn!(error = %err, "rpc relay got no answer");
            } else {
                tracing::debug!(error = %err, "rpc relay refused");
            }
            (status_for(&err), Json(json!({ "error": err.to_string() })))
        }
    }
}

/// Map an RPC outcome onto an HTTP status.
pub fn status_for(err: &RpcError) -> StatusCode {
    match err {
        // The server never answered; the cluster may still be healthy.
        RpcError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        // The server answered and said no.
        RpcError::Remote(_) | RpcError::MethodNotAllowed | RpcError::Decode(_) => StatusCode::BAD_GATEWAY,
        // This gateway cannot reach the cluster at all.
        RpcError::NotReady | RpcError::Transport(_) | RpcError::Closed => StatusCode::SERVICE_UNAVAILABLE,
    }
}
