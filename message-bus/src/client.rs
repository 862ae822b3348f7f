//! NATS client wrapper

use crate::{Error, Result};
use bytes::Bytes;
use tracing::info;

/// Thin wrapper over the NATS connection
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to NATS
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        info!("Connected to NATS at {}", url);
        Ok(Self { client })
    }

    /// Publish raw bytes to a subject
    pub async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject, payload)
            .await
            .map_err(|e| Error::Publish(e.to_string()))
    }

    /// Subscribe to a subject (wildcards allowed)
    pub async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber> {
        self.client
            .subscribe(subject)
            .await
            .map_err(|e| Error::Subscribe(e.to_string()))
    }

    /// Access the underlying client
    pub fn inner(&self) -> &async_nats::Client {
        &self.client
    }
}
