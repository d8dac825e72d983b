use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;

const DEFAULT_POOL_SIZE: usize = 100;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_LOG_FILTER: &str = "info";

/// Process-wide settings, read once at startup from the environment. There
/// is no authored topology file to load here — unlike the enclave configs
/// this crate's ancestor parsed from YAML, a cluster's shape is a runtime
/// parameter (`n_nodes` / `n_dcs`) supplied through the API or CLI, not a
/// checked-in document.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string. `None` means run against the in-memory
    /// store — fine for local/dev use, never for a real deployment.
    pub database_url: Option<String>,
    pub pool_size: usize,
    pub poll_interval: Duration,
    pub bind_addr: SocketAddr,
    /// Bearer token the API requires on every request. `None` disables
    /// auth, which `prov-api` only permits when `database_url` is also
    /// unset (a local/dev run).
    pub api_token: Option<String>,
    pub log_filter: String,
    pub aws_region: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = optional_var("PROV_DATABASE_URL");

        let pool_size = match optional_var("PROV_POOL_SIZE") {
            Some(raw) => parse_var("PROV_POOL_SIZE", &raw)?,
            None => DEFAULT_POOL_SIZE,
        };

        let poll_interval = match optional_var("PROV_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_var("PROV_POLL_INTERVAL_MS", &raw)?),
            None => Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        };

        let bind_raw = optional_var("PROV_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            var: "PROV_BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let api_token = optional_var("PROV_API_TOKEN");
        let log_filter = optional_var("PROV_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let aws_region = optional_var("AWS_REGION");

        debug!(
            pool_size,
            poll_interval_ms = poll_interval.as_millis() as u64,
            %bind_addr,
            has_database_url = database_url.is_some(),
            has_api_token = api_token.is_some(),
            "loaded settings from environment"
        );

        Ok(Self {
            database_url,
            pool_size,
            poll_interval,
            bind_addr,
            api_token,
            log_filter,
            aws_region,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var: name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
