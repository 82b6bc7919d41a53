//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The server's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,
    /// The URL of the NATS server backing the cluster.
    pub nats_url: String,
    /// The placement strategy used for media allocation.
    #[serde(default)]
    pub placement: PlacementKind,
}

/// The available placement strategies.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementKind {
    /// Take the first worker of the requested kind, in report order.
    FirstFit,
    /// Take the worker of the requested kind with the lowest occupancy.
    LeastOccupied,
}

impl Default for PlacementKind {
    fn default() -> Self {
        Self::FirstFit
    }
}

impl Config {
    /// Create a new config instance.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }
}
