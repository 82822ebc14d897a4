//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a `host:port` address without resolving the host
pub fn validate_socket_address(address: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{} '{}' {}", field_name, address, reason),
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("must be in host:port form"))?;

    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid("has an invalid host"));
    }

    let port: u16 = port.parse().map_err(|_| invalid("has an invalid port"))?;
    if port == 0 {
        return Err(invalid("cannot use port 0"));
    }

    // Ports 1-1023 usually need elevated privileges to bind
    if port <= 1023 {
        log::warn!("{} port {} is in the reserved range (1-1023)", field_name, port);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(1usize, "count", "test").is_ok());
        assert!(validate_positive(0usize, "count", "test").is_err());
    }

    #[test]
    fn test_validate_socket_address() {
        assert!(validate_socket_address("127.0.0.1:7001", "address", "test").is_ok());
        assert!(validate_socket_address("localhost:9000", "address", "test").is_ok());
        assert!(validate_socket_address("[::1]:7001", "address", "test").is_ok());
        assert!(validate_socket_address("127.0.0.1", "address", "test").is_err());
        assert!(validate_socket_address(":7001", "address", "test").is_err());
        assert!(validate_socket_address("host:70000", "address", "test").is_err());
        assert!(validate_socket_address("host:0", "address", "test").is_err());
    }
}
