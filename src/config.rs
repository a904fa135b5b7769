//! Configuration management for ProvChain

use crate::blockchain::{ValidationMode, DEFAULT_MINING_REWARD};
use crate::error::{ChainError, Result};
use crate::miner::DEFAULT_DIFFICULTY;
use crate::network::DEFAULT_PEER_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Highest accepted difficulty (leading zero hex digits).
pub const MAX_DIFFICULTY: usize = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_peer_timeout_secs")]
    pub peer_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bootstrap_peers: Vec::new(),
            peer_timeout_secs: default_peer_timeout_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    #[serde(default = "default_reward")]
    pub reward: f64,
    #[serde(default = "default_miner_address")]
    pub miner_address: String,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            miner_address: default_miner_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    #[serde(default = "default_strict_validation")]
    pub strict_validation: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            strict_validation: default_strict_validation(),
        }
    }
}

impl ConsensusConfig {
    pub fn validation_mode(&self) -> ValidationMode {
        if self.strict_validation {
            ValidationMode::Strict
        } else {
            ValidationMode::Linkage
        }
    }
}

impl Config {
    /// Parse TOML text; absent sections and fields take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| ChainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DIFFICULTY).contains(&self.mining.difficulty) {
            return Err(ChainError::Config(format!(
                "mining.difficulty must be between 1 and {MAX_DIFFICULTY}, got {}",
                self.mining.difficulty
            )));
        }
        if !self.mining.reward.is_finite() || self.mining.reward < 0.0 {
            return Err(ChainError::Config(
                "mining.reward must be a finite, non-negative number".to_string(),
            ));
        }
        if self.mining.miner_address.is_empty() {
            return Err(ChainError::Config(
                "mining.miner_address must be set".to_string(),
            ));
        }
        if self.network.peer_timeout_secs == 0 {
            return Err(ChainError::Config(
                "network.peer_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    }
    let text = fs::read_to_string(path)?;
    Config::from_toml(&text)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_peer_timeout_secs() -> u64 {
    DEFAULT_PEER_TIMEOUT.as_secs()
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_reward() -> f64 {
    DEFAULT_MINING_REWARD
}

fn default_miner_address() -> String {
    "miner-address".to_string()
}

fn default_strict_validation() -> bool {
    true
}
