//! Integration tests for enclave-config

use enclave_config::*;
use std::io::Write;
use std::time::Duration;
use temp_env::with_vars;

#[test]
fn test_default_config_validation() {
    let config = EnclaveConfig::default();
    assert!(config.validate_all().is_ok());
}

#[test]
fn test_config_loader_from_env() {
    let vars = vec![
        ("ENCLAVE_MAX_MESSAGE_SIZE", Some("4096")),
        ("ENCLAVE_MAX_CONCURRENT", Some("20")),
        ("ENCLAVE_CLEANUP_MARGIN", Some("4")),
        ("ENCLAVE_ACK_TIMEOUT", Some("12")),
        ("ENCLAVE_CONNECTION_KIND", Some("vsock")),
        ("ENCLAVE_VSOCK_CID", Some("16")),
        ("ENCLAVE_VSOCK_PORT", Some("5005")),
        ("ENCLAVE_LOG_LEVEL", Some("debug")),
    ];

    with_vars(vars, || {
        let loader = ConfigLoader::new();
        let config = loader.from_env().unwrap();

        assert_eq!(config.transport.max_message_size, 4096);
        assert_eq!(config.transport.max_concurrent, 20);
        assert_eq!(config.transport.cleanup_margin, 4);
        assert_eq!(config.transport.ack_timeout, Duration::from_secs(12));
        assert_eq!(config.connection.kind, ConnectionKind::Vsock);
        assert_eq!(config.connection.cid, 16);
        assert_eq!(config.connection.port, 5005);
        assert_eq!(config.logging.level, LogLevel::Debug);
    });
}

#[test]
fn test_invalid_env_value() {
    with_vars(vec![("ENCLAVE_QUEUE_CAPACITY", Some("many"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::EnvError(ref msg) if msg.contains("QUEUE_CAPACITY")));
    });
}

#[test]
fn test_env_override_is_validated() {
    with_vars(vec![("ENCLAVE_MAX_CONCURRENT", Some("0"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(matches!(err, ConfigError::DomainError { ref domain, .. } if domain == "transport"));
    });
}

#[test]
fn test_zero_cleanup_margin_from_env_is_rejected() {
    with_vars(vec![("ENCLAVE_CLEANUP_MARGIN", Some("0"))], || {
        let err = ConfigLoader::new().from_env().unwrap_err();
        assert!(err.to_string().contains("cleanup_margin"));
    });
}

#[test]
fn test_custom_prefix() {
    with_vars(vec![("GUEST_LOG_FORMAT", Some("json"))], || {
        let config = ConfigLoader::with_prefix("GUEST").from_env().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    });
}

#[test]
fn test_yaml_config_serialization() {
    let yaml = EnclaveConfig::generate_sample();
    assert!(yaml.contains("max_message_size: 1048576"));

    let parsed: EnclaveConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, EnclaveConfig::default());
}

#[test]
fn test_comprehensive_yaml_file() {
    let yaml = r#"
transport:
  max_message_size: 65536
  max_concurrent: 50
  cleanup_margin: 5
  queue_capacity: 8
  ack_timeout: 10

connection:
  kind: vsock
  cid: 2
  port: 9000

logging:
  level: warn
  format: json
  include_location: true
"#;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    with_vars(vec![("ENCLAVE_LOG_LEVEL", None::<&str>)], || {
        let config = ConfigLoader::new().from_file(file.path()).unwrap();

        assert_eq!(config.transport.max_message_size, 65536);
        assert_eq!(config.transport.cleanup_margin, 5);
        assert_eq!(config.transport.queue_capacity, 8);
        assert_eq!(config.transport.ack_timeout, Duration::from_secs(10));
        assert_eq!(config.connection.kind, ConnectionKind::Vsock);
        assert_eq!(config.connection.cid, 2);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.logging.include_location);
    });
}

#[test]
fn test_json_file_and_env_precedence() {
    let json = r#"{"connection": {"address": "10.0.0.5:8000"}, "logging": {"level": "error"}}"#;
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    with_vars(vec![("ENCLAVE_LOG_LEVEL", Some("trace"))], || {
        let config = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(config.connection.address, "10.0.0.5:8000");
        assert_eq!(config.connection.kind, ConnectionKind::Tcp);
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.transport, TransportConfig::default());
    });
}

#[test]
fn test_file_errors() {
    let loader = ConfigLoader::new();
    let missing = loader.from_file("/nonexistent/enclave.yaml").unwrap_err();
    assert!(matches!(missing, ConfigError::FileReadError(_)));

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"transport: [not, a, map]").unwrap();
    let malformed = loader.from_file(file.path()).unwrap_err();
    assert!(matches!(malformed, ConfigError::ParseError(_)));
}

#[test]
fn test_invalid_connection_in_file() {
    let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
    file.write_all(b"connection:\n  address: nowhere\n").unwrap();

    with_vars(vec![("ENCLAVE_CONNECTION_KIND", None::<&str>)], || {
        let err = ConfigLoader::new().from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("connection"));
    });
}
