use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};

use crate::client::RpcClient;
use crate::memory::MemoryTransport;
use crate::server::{MethodTable, RpcServer};
use crate::transport::{MessageProperties, Transport};

const TEST_QUEUE: &str = "rpc.server-under-test";

#[tokio::test]
async fn garbage_payload_does_not_kill_the_server() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let methods = MethodTable::new().register("ECHO", |body| async move { Ok(body) });
    let server = RpcServer::bind(transport.clone(), TEST_QUEUE, methods).await?;

    transport
        .send(TEST_QUEUE, "this is not json".into(), MessageProperties::default())
        .await?;

    // The server must still answer well-formed requests afterwards.
    let client = RpcClient::new(transport, Duration::from_secs(2)).await?;
    let data: Value = client.request(TEST_QUEUE, "ECHO", &json!("ok"), None).await?;
    assert_eq!(data, json!("ok"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn request_without_reply_destination_is_processed() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let methods = MethodTable::new().register("BUMP", move |_body| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });
    let server = RpcServer::bind(transport.clone(), TEST_QUEUE, methods).await?;

    let payload = serde_json::to_vec(&json!({ "method": "BUMP", "body": null }))?;
    transport
        .send(TEST_QUEUE, payload.into(), MessageProperties::default())
        .await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1, "handler was not invoked");

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_accept_loop() -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let methods = MethodTable::new().register("BUMP", move |_body| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });
    let server = RpcServer::bind(transport.clone(), TEST_QUEUE, methods).await?;
    server.shutdown().await;

    let payload = serde_json::to_vec(&json!({ "method": "BUMP", "body": null }))?;
    transport
        .send(TEST_QUEUE, payload.into(), MessageProperties::default())
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0, "handler ran after shutdown");
    Ok(())
}
