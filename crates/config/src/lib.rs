//! Process configuration, loaded from a toml file by the binary.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub coordinator: CoordinatorConfig,
    pub chains: Vec<ChainConfig>,
    pub tokens: TokenConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CoordinatorConfig {
    /// Directory holding the rocksdb data.
    pub datadir: PathBuf,

    /// Optimistic-transaction retry budget for the stores.
    #[serde(default = "default_db_retry_count")]
    pub db_retry_count: u16,

    /// Worker threads in the blocking storage pool.
    #[serde(default = "default_pool_threads")]
    pub pool_threads: usize,
}

/// One supported chain: the bus alias and its SLIP-44 id.
#[derive(Clone, Debug, Deserialize)]
pub struct ChainConfig {
    pub alias: String,
    pub slip44: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenConfig {
    /// Symbols the token-key registry is seeded with.
    pub symbols: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatcherConfig {
    /// Redelivery cap the in-process bus enforces before dropping.
    #[serde(default = "default_max_redelivery")]
    pub max_redelivery: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_redelivery: default_max_redelivery(),
        }
    }
}

fn default_db_retry_count() -> u16 {
    5
}

fn default_pool_threads() -> usize {
    8
}

fn default_max_redelivery() -> u32 {
    25
}

impl Config {
    pub fn from_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let raw = r#"
            [coordinator]
            datadir = "/var/lib/zkpay"

            [[chains]]
            alias = "bsc"
            slip44 = 714

            [[chains]]
            alias = "eth"
            slip44 = 60

            [tokens]
            symbols = ["USDT", "USDC"]
        "#;
        let config = Config::from_str(raw).unwrap();
        assert_eq!(config.coordinator.db_retry_count, 5);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].alias, "bsc");
        assert_eq!(config.tokens.symbols, vec!["USDT", "USDC"]);
        assert_eq!(config.dispatcher.max_redelivery, 25);
    }
}
