use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. When absent the ledger runs on the in-memory store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Connection pool sizing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Ledger behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Upper bound on any single balance-row lock wait. 0 disables the bound.
    pub lock_timeout_ms: u64,
    /// Threshold used by the low-stock endpoint when the caller omits one.
    pub low_stock_threshold: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            low_stock_threshold: 10,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Option<std::time::Duration> {
        (self.lock_timeout_ms > 0).then(|| std::time::Duration::from_millis(self.lock_timeout_ms))
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}
