//! Domain-specific configuration modules

pub mod connection;
pub mod logging;
pub mod transport;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Complete configuration combining all domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EnclaveConfig {
    /// Framing and acknowledgment limits
    #[serde(default)]
    pub transport: transport::TransportConfig,

    /// Where to listen or connect
    #[serde(default)]
    pub connection: connection::ConnectionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl EnclaveConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.transport.validate()?;
        self.connection.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = EnclaveConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
