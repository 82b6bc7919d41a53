use anyhow::Result;
use serde_json::{json, Value};

use crate::rpc::{RpcRequest, RpcResponse};

#[test]
fn request_round_trips_through_wire_form() -> Result<()> {
    let req = RpcRequest {
        method: crate::rpc::ALLOC_MEDIA.into(),
        body: json!({"caller": "c0", "kind": "producer"}),
    };
    let bytes = serde_json::to_vec(&req)?;
    let decoded: RpcRequest = serde_json::from_slice(&bytes)?;
    assert_eq!(decoded.method, req.method, "method mismatch after round trip");
    assert_eq!(decoded.body, req.body, "body mismatch after round trip");
    Ok(())
}

#[test]
fn response_codes_match_wire_contract() -> Result<()> {
    let ok = serde_json::to_value(RpcResponse::Ok(json!({"agent": "a0"})))?;
    assert_eq!(ok["code"], 0, "success must serialize as code 0, got {}", ok["code"]);
    assert_eq!(ok["data"]["agent"], "a0", "success payload must ride in data");

    let fail = serde_json::to_value(RpcResponse::failure("boom"))?;
    assert_eq!(fail["code"], 1, "failure must serialize as code 1, got {}", fail["code"]);
    assert_eq!(fail["data"], "boom", "failure reason must ride in data");

    let timeout = serde_json::to_value(RpcResponse::Timeout)?;
    assert_eq!(timeout["code"], 2, "timeout must serialize as code 2");
    assert!(timeout.get("data").is_none(), "timeout must carry no data field");

    let not_allowed = serde_json::to_value(RpcResponse::MethodNotAllowed)?;
    assert_eq!(not_allowed["code"], 3, "method-not-allowed must serialize as code 3");
    Ok(())
}

#[test]
fn response_decodes_each_known_code() -> Result<()> {
    let ok: RpcResponse = serde_json::from_value(json!({"code": 0, "data": [1, 2]}))?;
    assert_eq!(ok, RpcResponse::Ok(json!([1, 2])));

    let fail: RpcResponse = serde_json::from_value(json!({"code": 1, "data": "no such worker"}))?;
    assert_eq!(fail, RpcResponse::Failure("no such worker".into()));

    let timeout: RpcResponse = serde_json::from_value(json!({"code": 2}))?;
    assert_eq!(timeout, RpcResponse::Timeout);

    let not_allowed: RpcResponse = serde_json::from_value(json!({"code": 3}))?;
    assert_eq!(not_allowed, RpcResponse::MethodNotAllowed);
    Ok(())
}

#[test]
fn response_rejects_unknown_codes() {
    let res: Result<RpcResponse, _> = serde_json::from_value(json!({"code": 42}));
    assert!(res.is_err(), "expected decode of unknown code to fail");
}

#[test]
fn success_with_no_data_decodes_as_null() -> Result<()> {
    let ok: RpcResponse = serde_json::from_value(json!({"code": 0}))?;
    assert_eq!(ok, RpcResponse::Ok(Value::Null), "missing data must decode as null payload");
    Ok(())
}
