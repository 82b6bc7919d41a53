//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

use medley_mq::DEFAULT_RPC_TIMEOUT;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The server's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,
    /// The port which HTTP traffic is to use.
    pub http_port: u16,
    /// The URL of the NATS server backing the cluster.
    pub nats_url: String,
    /// The per-call RPC timeout, in milliseconds.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

fn default_rpc_timeout_ms() -> u64 {
    DEFAULT_RPC_TIMEOUT.as_millis() as u64
}

impl Config {
    /// Create a new config instance.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }
}
