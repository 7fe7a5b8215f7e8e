//! Stats API configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

const ENV_PREFIX: &str = "STATS_API";
const CONFIG_FILE: &str = "stats-api";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Port serving the summary, health and metrics endpoints
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Base URL of the Prometheus server
    #[serde(default = "default_prometheus_url")]
    pub prometheus_url: String,

    /// Upper bound on one summary's backend queries
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Name reported in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
}

fn default_listen_port() -> u16 {
    8085
}

fn default_prometheus_url() -> String {
    "http://prometheus:9090".to_string()
}

fn default_query_timeout() -> u64 {
    30
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "stats-api".to_string())
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            prometheus_url: default_prometheus_url(),
            query_timeout_secs: default_query_timeout(),
            instance_name: default_instance_name(),
        }
    }
}

impl ApiConfig {
    /// Load from an optional `stats-api.{toml,yaml,json}` in the working
    /// directory, overridden by `STATS_API_*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(file_stem: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid stats-api configuration")
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}
