//! Transport limits: frame size, delivery tracking and queueing

use crate::domains::utils::serde_duration;
use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied to every acknowledged connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest payload accepted on send and receive, in bytes
    pub max_message_size: usize,

    /// Delivery records a writer keeps after cleanup
    pub max_concurrent: usize,

    /// Growth above `max_concurrent` tolerated before a cleanup pass
    pub cleanup_margin: usize,

    /// Bound of the pending-send queue
    pub queue_capacity: usize,

    /// How long senders wait for an acknowledgment
    #[serde(with = "serde_duration")]
    pub ack_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_message_size: 1 << 20,
            max_concurrent: 100,
            cleanup_margin: 10,
            queue_capacity: 100,
            ack_timeout: Duration::from_secs(5),
        }
    }
}

impl Validatable for TransportConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_positive(self.max_message_size, "max_message_size", domain)?;
        validate_positive(self.max_concurrent, "max_concurrent", domain)?;
        validate_positive(self.cleanup_margin, "cleanup_margin", domain)?;
        validate_positive(self.queue_capacity, "queue_capacity", domain)?;

        // The length field on the wire is 32 bits
        if self.max_message_size as u64 > u64::from(u32::MAX) {
            return Err(self.validation_error(format!(
                "max_message_size must fit in 32 bits, got {}",
                self.max_message_size
            )));
        }

        if self.ack_timeout.is_zero() {
            return Err(self.validation_error("ack_timeout must be greater than 0"));
        }

        if self.max_message_size > 16 << 20 {
            log::warn!(
                "max_message_size {} is above 16 MiB; each frame is buffered in memory",
                self.max_message_size
            );
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "transport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.max_message_size, 1_048_576);
        assert_eq!(config.max_concurrent, 100);
        assert_eq!(config.cleanup_margin, 10);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.ack_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_transport_validation() {
        let mut config = TransportConfig::default();
        config.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = TransportConfig::default();
        config.ack_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = TransportConfig::default();
        config.max_message_size = u32::MAX as usize + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ack_timeout_in_seconds() {
        let config: TransportConfig = serde_yaml::from_str("ack_timeout: 30").unwrap();
        assert_eq!(config.ack_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent, 100);
    }
}
