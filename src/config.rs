use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::poller::{PollerConfig, DEFAULT_POLL_INTERVAL};
use crate::window::DEFAULT_WINDOW_CAPACITY;

pub const DEFAULT_SCAN_BLOCKS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub eth_rpc_url: String,
    pub indexer_url: Option<String>,
    pub indexer_network: String,
    pub http_bind_addr: String,
    pub poll_interval: Duration,
    pub block_window: usize,
    pub scan_blocks: u64,
    pub rpc_timeout: Option<Duration>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("missing ETH_RPC_URL env var")]
    MissingEthRpcUrl,
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let eth_rpc_url = lookup("ETH_RPC_URL").ok_or(ConfigError::MissingEthRpcUrl)?;
        let indexer_url = lookup("INDEXER_URL").filter(|s| !s.trim().is_empty());
        let indexer_network = lookup("INDEXER_NETWORK").unwrap_or_else(|| "mainnet".to_string());
        let http_bind_addr = lookup("HTTP_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());

        let poll_interval = parse_var::<u64>(&lookup, "POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let block_window =
            parse_var::<usize>(&lookup, "BLOCK_WINDOW")?.unwrap_or(DEFAULT_WINDOW_CAPACITY);
        let scan_blocks = parse_var::<u64>(&lookup, "SCAN_BLOCKS")?.unwrap_or(DEFAULT_SCAN_BLOCKS);
        let rpc_timeout = parse_var::<u64>(&lookup, "RPC_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Self {
            eth_rpc_url,
            indexer_url,
            indexer_network,
            http_bind_addr,
            poll_interval,
            block_window,
            scan_blocks,
            rpc_timeout,
        })
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            window_capacity: self.block_window,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("ETH_RPC_URL", "http://node:8545")])).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.block_window, 20);
        assert_eq!(config.scan_blocks, DEFAULT_SCAN_BLOCKS);
        assert_eq!(config.indexer_network, "mainnet");
        assert!(config.indexer_url.is_none());
        assert!(config.rpc_timeout.is_none());
    }

    #[test]
    fn rpc_url_is_required() {
        assert_eq!(
            Config::from_lookup(lookup_from(&[])).unwrap_err(),
            ConfigError::MissingEthRpcUrl
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("ETH_RPC_URL", "http://node:8545"),
            ("POLL_INTERVAL_MS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "POLL_INTERVAL_MS",
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("ETH_RPC_URL", "http://node:8545"),
            ("INDEXER_URL", "http://indexer"),
            ("POLL_INTERVAL_MS", "500"),
            ("BLOCK_WINDOW", "5"),
            ("RPC_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.poller().interval, Duration::from_millis(500));
        assert_eq!(config.poller().window_capacity, 5);
        assert_eq!(config.indexer_url.as_deref(), Some("http://indexer"));
        assert_eq!(config.rpc_timeout, Some(Duration::from_secs(3)));
    }
}
