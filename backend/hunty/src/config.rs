//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::errors::{HuntyError, Result};
use crate::retry::RetryPolicy;

pub const DEFAULT_RPC_URL: &str = "https://rpc.futurenet.stellar.org";
pub const DEFAULT_NETWORK_PASSPHRASE: &str = "Test SDF Future Network ; October 2022";

#[derive(Debug, Clone)]
pub struct Config {
    /// Soroban RPC endpoint
    pub rpc_url: String,
    /// Network passphrase mixed into every transaction signature
    pub network_passphrase: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// JSON-RPC wallet bridge; no wallet is available when unset
    pub wallet_bridge_url: Option<String>,
    /// How long a registration status stays cached
    pub cache_ttl_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Upper time bound placed on built transactions
    pub tx_timeout_secs: u64,
    /// Fee in stroops charged per operation
    pub tx_base_fee: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("SOROBAN_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            network_passphrase: env_var("SOROBAN_NETWORK_PASSPHRASE")
                .unwrap_or_else(|_| DEFAULT_NETWORK_PASSPHRASE.to_string()),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./hunty.db".to_string()),
            api_port: parse_or("API_PORT", 3001)?,
            wallet_bridge_url: env_var("WALLET_BRIDGE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            cache_ttl_secs: parse_or("REGISTRATION_CACHE_TTL_SECS", 300)?,
            retry_max_attempts: parse_or("RETRY_MAX_ATTEMPTS", 3)?,
            retry_initial_delay_ms: parse_or("RETRY_INITIAL_DELAY_MS", 1000)?,
            retry_max_delay_ms: parse_or("RETRY_MAX_DELAY_MS", 10_000)?,
            tx_timeout_secs: parse_or("TX_TIMEOUT_SECS", 180)?,
            tx_base_fee: parse_or("TX_BASE_FEE", 100)?,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            multiplier: 2,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| HuntyError::Config(format!("Missing env var: {key}")))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HuntyError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}
