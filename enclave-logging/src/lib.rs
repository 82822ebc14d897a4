//! Logging setup for the enclave tools
//!
//! Libraries in this workspace only emit `tracing` events; binaries call one
//! of the initializers here once at startup.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
