//! Configuration for the enclave transport and its command-line tools
//!
//! Settings are grouped by domain (transport limits, connection target,
//! logging), loaded from YAML or JSON, overridden from `ENCLAVE_*`
//! environment variables and validated before use.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    connection::{ConnectionConfig, ConnectionKind},
    logging::{LogFormat, LogLevel, LoggingConfig},
    transport::TransportConfig,
    EnclaveConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
