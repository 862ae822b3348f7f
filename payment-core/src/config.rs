//! Configuration for the payment ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Payment policy configuration
    pub payments: PaymentConfig,

    /// Writer actor mailbox capacity
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/payments"),
            service_name: "payment-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDbConfig::default(),
            payments: PaymentConfig::default(),
            mailbox_capacity: 1000,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 128,
            max_write_buffer_number: 4,
            target_file_size_mb: 128,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

/// Payment policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Retry ceiling after an insufficient-funds decline
    pub max_retry_attempts: u32,

    /// Seconds a pre-terminal payment may live before expiry
    pub payment_ttl_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            payment_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("PAYMENT_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(max_retries) = std::env::var("PAYMENT_MAX_RETRIES") {
            config.payments.max_retry_attempts = max_retries
                .parse()
                .map_err(|_| crate::Error::Config("PAYMENT_MAX_RETRIES must be an integer".to_string()))?;
        }

        if let Ok(ttl) = std::env::var("PAYMENT_TTL_SECS") {
            config.payments.payment_ttl_secs = ttl
                .parse()
                .map_err(|_| crate::Error::Config("PAYMENT_TTL_SECS must be an integer".to_string()))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "payment-core");
        assert_eq!(config.payments.max_retry_attempts, 3);
        assert_eq!(config.mailbox_capacity, 1000);
    }
}
