use anyhow::Result;

use super::config::Config;

#[test]
fn config_deserializes_from_full_env() -> Result<()> {
    let config: Config = envy::from_iter(vec![
        ("RUST_LOG".into(), "error".into()),
        ("HTTP_PORT".into(), "8080".into()),
        ("NATS_URL".into(), "nats://localhost:4222".into()),
        ("RPC_TIMEOUT_MS".into(), "2500".into()),
    ])?;

    assert!(config.rust_log == "error", "unexpected value parsed for RUST_LOG, got {}", config.rust_log);
    assert!(config.http_port == 8080, "unexpected value parsed for HTTP_PORT, got {}", config.http_port);
    assert!(
        config.nats_url == "nats://localhost:4222",
        "unexpected value parsed for NATS_URL, got {}",
        config.nats_url
    );
    assert!(
        config.rpc_timeout_ms == 2500,
        "unexpected value parsed for RPC_TIMEOUT_MS, got {}",
        config.rpc_timeout_ms
    );

    Ok(())
}

#[test]
fn config_deserializes_from_sparse_env() -> Result<()> {
    let config: Config = envy::from_iter(vec![
        ("RUST_LOG".into(), "error".into()),
        ("HTTP_PORT".into(), "8080".into()),
        ("NATS_URL".into(), "nats://localhost:4222".into()),
    ])?;

    assert!(
        config.rpc_timeout_ms == 10_000,
        "unexpected default for RPC_TIMEOUT_MS, got {}",
        config.rpc_timeout_ms
    );

    Ok(())
}
