//! Connection target: TCP for development, vsock inside a confidential VM

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_socket_address, Validatable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known vsock CID of the host
pub const VSOCK_CID_HOST: u32 = 2;

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Socket family to use
    pub kind: ConnectionKind,

    /// TCP address to listen on or connect to
    pub address: String,

    /// vsock context ID of the peer when connecting
    pub cid: u32,

    /// vsock port
    pub port: u32,
}

/// Socket family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    #[default]
    Tcp,
    Vsock,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: ConnectionKind::Tcp,
            address: "127.0.0.1:7001".to_string(),
            cid: 3,
            port: 7001,
        }
    }
}

impl FromStr for ConnectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tcp" => Ok(ConnectionKind::Tcp),
            "vsock" => Ok(ConnectionKind::Vsock),
            _ => Err(format!("Invalid connection kind: {}", s)),
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Tcp => write!(f, "tcp"),
            ConnectionKind::Vsock => write!(f, "vsock"),
        }
    }
}

impl Validatable for ConnectionConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self.kind {
            ConnectionKind::Tcp => {
                validate_required_string(&self.address, "address", self.domain_name())?;
                validate_socket_address(&self.address, "address", self.domain_name())?;
            }
            ConnectionKind::Vsock => {
                // CIDs 0 and 1 are reserved for the hypervisor and local loopback
                if self.cid < VSOCK_CID_HOST {
                    return Err(self.validation_error(format!(
                        "cid {} is reserved, use {} for the host or 3 and above for guests",
                        self.cid, VSOCK_CID_HOST
                    )));
                }
                if self.port == 0 {
                    return Err(self.validation_error("port cannot be 0"));
                }
            }
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "connection"
    }
}
