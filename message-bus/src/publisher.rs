//! Message publisher with retry logic

use crate::{
    client::NatsClient,
    message::Message,
    metrics::{MESSAGE_PUBLISH_DURATION, MESSAGE_PUBLISH_TOTAL},
    Error, Result,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Publish timeout
    pub publish_timeout: Duration,

    /// Max retry attempts
    pub max_retry_attempts: u32,

    /// Initial retry delay
    pub initial_retry_delay: Duration,

    /// Max retry delay
    pub max_retry_delay: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            publish_timeout: Duration::from_secs(5),
            max_retry_attempts: 3,
            initial_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Message publisher
pub struct Publisher {
    client: Arc<NatsClient>,
    config: PublisherConfig,
}

impl Publisher {
    /// Create new publisher
    pub fn new(client: Arc<NatsClient>, config: PublisherConfig) -> Self {
        Self { client, config }
    }

    /// Publish message
    pub async fn publish(&self, message: &Message) -> Result<()> {
        let start = Instant::now();
        let subject = message.subject();
        let type_label = message.message_type.subject_prefix();

        debug!("Publishing message {} to subject {}", message.id, subject);

        let payload = Bytes::from(message.to_bytes()?);
        let result = self.publish_with_retry(&subject, payload).await;

        MESSAGE_PUBLISH_DURATION
            .with_label_values(&[type_label])
            .observe(start.elapsed().as_secs_f64());

        let status = if result.is_ok() { "success" } else { "error" };
        MESSAGE_PUBLISH_TOTAL
            .with_label_values(&[type_label, status])
            .inc();

        result
    }

    /// Publish with exponential backoff retry
    async fn publish_with_retry(&self, subject: &str, payload: Bytes) -> Result<()> {
        let mut attempts = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempts += 1;

            let attempt = tokio::time::timeout(
                self.config.publish_timeout,
                self.client.publish(subject.to_string(), payload.clone()),
            )
            .await;

            match attempt {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => {
                    if attempts >= self.config.max_retry_attempts {
                        warn!(
                            "Publish to {} failed after {} attempts: {}",
                            subject, attempts, e
                        );
                        return Err(e);
                    }
                    warn!("Publish to {} failed (attempt {}): {}", subject, attempts, e);
                }
                Err(_) => {
                    if attempts >= self.config.max_retry_attempts {
                        return Err(Error::PublishTimeout(subject.to_string()));
                    }
                    warn!("Publish to {} timed out (attempt {})", subject, attempts);
                }
            }

            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.config.max_retry_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_config_defaults() {
        let config = PublisherConfig::default();
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.initial_retry_delay, Duration::from_millis(100));
        assert!(config.max_retry_delay > config.initial_retry_delay);
    }
}
