use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use medley_core::media::CreateTransportRequest;
use medley_core::RpcError;

use super::routes::{status_for, MediaCall};

#[test]
fn media_call_splits_routing_from_the_rpc_body() -> Result<()> {
    let call: MediaCall<CreateTransportRequest> = serde_json::from_value(json!({
        "agent": "media@a",
        "caller": "portal@1",
        "worker": "w0",
    }))?;
    assert_eq!(call.agent, "media@a");
    assert_eq!(call.body.caller, "portal@1");
    assert_eq!(call.body.worker, "w0");
    Ok(())
}

#[test]
fn rpc_outcomes_map_onto_distinct_status_classes() {
    assert_eq!(status_for(&RpcError::Timeout), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(status_for(&RpcError::Remote("no agents in cluster view".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(&RpcError::MethodNotAllowed), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(&RpcError::Decode("bad payload".into())), StatusCode::BAD_GATEWAY);
    assert_eq!(status_for(&RpcError::NotReady), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_for(&RpcError::Closed), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_for(&RpcError::Transport(anyhow::anyhow!("no broker"))), StatusCode::SERVICE_UNAVAILABLE);
}
