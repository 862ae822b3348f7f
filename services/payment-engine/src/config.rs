//! Service configuration from environment variables

use std::env;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub http_port: u16,
    /// NATS server URL
    pub nats_url: String,
    /// Whether to wire the coordination gateway at all
    pub gateway_enabled: bool,
    /// RocksDB data directory
    pub data_dir: String,
    /// Seconds between settlement sweeps
    pub sweep_interval_secs: u64,
    /// Seconds a payment sits in PENDING_APPROVAL before resolution
    pub approval_delay_secs: u64,
    /// Seconds a pre-terminal payment may live before expiry
    pub payment_ttl_secs: u64,
    /// Probability the simulated gateway approves a swept payment
    pub approve_ratio: f64,
}

impl Config {
    /// Load configuration from the environment with defaults
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv::dotenv().ok();

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8084);

        let nats_url = env::var("NATS_URL").unwrap_or_else(|_| "nats://nats:4222".to_string());

        let gateway_enabled = env::var("GATEWAY_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        let data_dir = env::var("PAYMENT_DATA_DIR").unwrap_or_else(|_| "./data/payments".to_string());

        let sweep_interval_secs = env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let approval_delay_secs = env::var("APPROVAL_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(90);

        let payment_ttl_secs = env::var("PAYMENT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24 * 60 * 60);

        let approve_ratio = env::var("SWEEP_APPROVE_RATIO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.9);

        Ok(Config {
            http_port,
            nats_url,
            gateway_enabled,
            data_dir,
            sweep_interval_secs,
            approval_delay_secs,
            payment_ttl_secs,
            approve_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.http_port, 8084);
        assert_eq!(config.sweep_interval_secs, 30);
        assert!(config.approve_ratio > 0.8);
        assert!(config.gateway_enabled);
    }
}
