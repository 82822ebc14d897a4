//! Configuration loading and environment variable handling

use crate::domains::connection::ConnectionConfig;
use crate::domains::logging::{LogFormat, LogLevel, LoggingConfig};
use crate::domains::transport::TransportConfig;
use crate::domains::EnclaveConfig;
use crate::error::{ConfigError, ConfigResult};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "ENCLAVE".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file (JSON when the extension is
    /// `.json`) with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<EnclaveConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: EnclaveConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config)?;

        // Validate all domains
        config.validate_all()?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<EnclaveConfig> {
        let mut config = EnclaveConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<EnclaveConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut EnclaveConfig) -> ConfigResult<()> {
        self.apply_transport_overrides(&mut config.transport)?;
        self.apply_connection_overrides(&mut config.connection)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply transport config overrides
    fn apply_transport_overrides(&self, config: &mut TransportConfig) -> ConfigResult<()> {
        if let Some(size) = self.parse_env_var("MAX_MESSAGE_SIZE")? {
            config.max_message_size = size;
        }

        if let Some(max) = self.parse_env_var("MAX_CONCURRENT")? {
            config.max_concurrent = max;
        }

        if let Some(margin) = self.parse_env_var("CLEANUP_MARGIN")? {
            config.cleanup_margin = margin;
        }

        if let Some(capacity) = self.parse_env_var("QUEUE_CAPACITY")? {
            config.queue_capacity = capacity;
        }

        if let Some(seconds) = self.parse_env_var::<u64>("ACK_TIMEOUT")? {
            config.ack_timeout = std::time::Duration::from_secs(seconds);
        }

        Ok(())
    }

    /// Apply connection config overrides
    fn apply_connection_overrides(&self, config: &mut ConnectionConfig) -> ConfigResult<()> {
        if let Some(kind) = self.parse_env_var("CONNECTION_KIND")? {
            config.kind = kind;
        }

        if let Ok(address) = self.get_env_var("CONNECTION_ADDRESS") {
            config.address = address;
        }

        if let Some(cid) = self.parse_env_var("VSOCK_CID")? {
            config.cid = cid;
        }

        if let Some(port) = self.parse_env_var("VSOCK_PORT")? {
            config.port = port;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.parse_env_var::<LogLevel>("LOG_LEVEL")? {
            config.level = level;
        }

        if let Some(format) = self.parse_env_var::<LogFormat>("LOG_FORMAT")? {
            config.format = format;
        }

        Ok(())
    }

    /// Parse a prefixed variable if it is set
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get_env_var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
