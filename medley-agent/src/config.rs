//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

use medley_mq::DEFAULT_REPORT_INTERVAL;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The server's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,
    /// The URL of the NATS server backing the cluster.
    pub nats_url: String,
    /// The number of media workers to run, defaulting to the host's available
    /// parallelism.
    #[serde(default = "default_worker_num")]
    pub worker_num: usize,
    /// How many of the workers handle the producer side. The remainder handle
    /// the consumer side. Defaults to half, rounded up.
    ///
    /// This value is clamped to `worker_num` during construction.
    #[serde(default)]
    pub producer_worker_num: usize,
    /// The interval between cluster load reports, in milliseconds.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

fn default_worker_num() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_report_interval_ms() -> u64 {
    DEFAULT_REPORT_INTERVAL.as_millis() as u64
}

impl Config {
    /// Create a new config instance.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        let mut config: Config = envy::from_env().context("error building config from env")?;
        if config.worker_num == 0 {
            anyhow::bail!("WORKER_NUM must be at least 1");
        }
        if config.producer_worker_num == 0 {
            config.producer_worker_num = (config.worker_num + 1) / 2;
        }
        config.producer_worker_num = config.producer_worker_num.min(config.worker_num);
        Ok(config)
    }
}
