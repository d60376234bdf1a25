//! Runtime configuration
//!
//! Every field has a serde default, so a partial JSON document (or none at
//! all) yields a usable configuration. Environment overrides follow the
//! `MINICOIN_<SECTION>_<KEY>` naming scheme.

use crate::constants::{BLOCK_VERSION, DEFAULT_BITS};
use crate::error::{MinicoinError, Result};
use crate::types::Network;
use serde::{Deserialize, Serialize};

/// Block construction and nonce search settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Header version for new blocks
    #[serde(default = "default_block_version")]
    pub block_version: i32,

    /// Compact difficulty used when the caller does not supply one
    #[serde(default = "default_bits")]
    pub default_bits: u32,

    /// Threads sharing the nonce range (1 = search on the calling thread)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Nonces between hash-rate progress events
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_block_version() -> i32 {
    BLOCK_VERSION
}

fn default_bits() -> u32 {
    DEFAULT_BITS
}

fn default_workers() -> usize {
    1
}

fn default_progress_interval() -> u64 {
    100_000
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            block_version: default_block_version(),
            default_bits: default_bits(),
            workers: default_workers(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Transaction relay endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_mainnet_endpoint")]
    pub mainnet_endpoint: String,

    #[serde(default = "default_testnet_endpoint")]
    pub testnet_endpoint: String,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mainnet_endpoint() -> String {
    "https://api.blockcypher.com/v1/btc/main/txs/push".to_string()
}

fn default_testnet_endpoint() -> String {
    "https://api.blockcypher.com/v1/btc/test3/txs/push".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            mainnet_endpoint: default_mainnet_endpoint(),
            testnet_endpoint: default_testnet_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BroadcastConfig {
    pub fn endpoint(&self, network: Network) -> &str {
        match network {
            Network::Main => &self.mainnet_endpoint,
            Network::Test => &self.testnet_endpoint,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinicoinConfig {
    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub mining: MiningConfig,

    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

impl MinicoinConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MinicoinError::Config(format!("failed to parse config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MinicoinError::Config(format!("failed to serialize config: {}", e)))
    }

    /// Defaults overridden by `MINICOIN_*` environment variables.
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MinicoinConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("MINICOIN_NETWORK") {
            if let Ok(network) = val.parse::<Network>() {
                config.network = network;
            }
        }

        if let Some(val) = lookup("MINICOIN_MINING_BLOCK_VERSION") {
            if let Ok(version) = val.parse::<i32>() {
                config.mining.block_version = version;
            }
        }
        if let Some(val) = lookup("MINICOIN_MINING_DEFAULT_BITS") {
            if let Ok(bits) = crate::pow::parse_compact_bits(&val) {
                config.mining.default_bits = bits;
            }
        }
        if let Some(val) = lookup("MINICOIN_MINING_WORKERS") {
            if let Ok(workers) = val.parse::<usize>() {
                config.mining.workers = workers;
            }
        }
        if let Some(val) = lookup("MINICOIN_MINING_PROGRESS_INTERVAL") {
            if let Ok(interval) = val.parse::<u64>() {
                config.mining.progress_interval = interval;
            }
        }

        if let Some(val) = lookup("MINICOIN_BROADCAST_MAINNET_ENDPOINT") {
            config.broadcast.mainnet_endpoint = val;
        }
        if let Some(val) = lookup("MINICOIN_BROADCAST_TESTNET_ENDPOINT") {
            config.broadcast.testnet_endpoint = val;
        }
        if let Some(val) = lookup("MINICOIN_BROADCAST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                config.broadcast.timeout_secs = secs;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.mining.workers == 0 {
            return Err(MinicoinError::Config("mining.workers must be at least 1".to_string()));
        }
        if self.mining.progress_interval == 0 {
            return Err(MinicoinError::Config(
                "mining.progress_interval must be at least 1".to_string(),
            ));
        }
        for endpoint in [&self.broadcast.mainnet_endpoint, &self.broadcast.testnet_endpoint] {
            reqwest::Url::parse(endpoint).map_err(|e| {
                MinicoinError::Config(format!("invalid broadcast endpoint {:?}: {}", endpoint, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = MinicoinConfig::default();
        assert_eq!(config.network, Network::Test);
        assert_eq!(config.mining.block_version, 2);
        assert_eq!(config.mining.default_bits, 0x1f010000);
        assert_eq!(config.mining.workers, 1);
        assert!(config.broadcast.endpoint(Network::Test).contains("test3"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = MinicoinConfig::from_json_str(r#"{"network": "main", "mining": {"workers": 4}}"#).unwrap();
        assert_eq!(config.network, Network::Main);
        assert_eq!(config.mining.workers, 4);
        assert_eq!(config.mining.progress_interval, 100_000);
        assert_eq!(config.broadcast, BroadcastConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = MinicoinConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(MinicoinConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = MinicoinConfig::from_json_str(r#"{"mining": {"workers": 0}}"#);
        assert!(matches!(result, Err(MinicoinError::Config(_))));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut config = MinicoinConfig::default();
        config.broadcast.testnet_endpoint = "not a url".to_string();
        assert!(matches!(config.validate(), Err(MinicoinError::Config(_))));
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MINICOIN_NETWORK", "mainnet"),
            ("MINICOIN_MINING_DEFAULT_BITS", "0x207fffff"),
            ("MINICOIN_MINING_WORKERS", "8"),
            ("MINICOIN_MINING_PROGRESS_INTERVAL", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = MinicoinConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.network, Network::Main);
        assert_eq!(config.mining.default_bits, 0x207fffff);
        assert_eq!(config.mining.workers, 8);
        assert_eq!(config.mining.progress_interval, 100_000);
    }
}
