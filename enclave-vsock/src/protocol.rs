//! Payload definitions exchanged between the host manager and the guest agent
//!
//! The transport itself is agnostic to these types; they are carried as
//! JSON-encoded payloads of ordinary data frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Description of a computation to run inside the guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Hex-encoded digest of the algorithm the guest should accept
    #[serde(default)]
    pub algorithm_hash: Option<String>,
    /// Hex-encoded digests of the datasets the guest should accept
    #[serde(default)]
    pub dataset_hashes: Vec<String>,
}

impl ComputationSpec {
    /// Create a computation with no expected artifacts
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            algorithm_hash: None,
            dataset_hashes: Vec::new(),
        }
    }
}

/// Messages sent from the host manager to the guest agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerMessage {
    /// Start a computation
    RunRequest { computation: ComputationSpec },

    /// Deliver the algorithm binary or script
    AlgorithmUpload { algorithm: Vec<u8> },

    /// Deliver one dataset
    DatasetUpload { dataset: Vec<u8>, filename: String },

    /// Abort a running computation
    Stop { computation_id: String },
}

/// Messages streamed from the guest agent back to the host manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Agent is ready for work
    Ready { agent_id: String },

    /// A log line produced while running a computation
    Log {
        computation_id: String,
        level: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A lifecycle event of a computation
    Event {
        computation_id: String,
        event_type: String,
        status: String,
        #[serde(default)]
        details: Option<String>,
    },

    /// Final output of a computation
    RunResult {
        computation_id: String,
        result: Vec<u8>,
    },
}

impl fmt::Display for ManagerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerMessage::RunRequest { computation } => {
                write!(f, "run request ({})", computation.id)
            }
            ManagerMessage::AlgorithmUpload { algorithm } => {
                write!(f, "algorithm upload ({} bytes)", algorithm.len())
            }
            ManagerMessage::DatasetUpload { dataset, filename } => {
                write!(f, "dataset upload {} ({} bytes)", filename, dataset.len())
            }
            ManagerMessage::Stop { computation_id } => {
                write!(f, "stop ({})", computation_id)
            }
        }
    }
}

/// Message envelope for all structured payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T> {
    pub protocol_version: u32,
    pub timestamp: DateTime<Utc>,
    pub message: T,
}

impl<T> MessageEnvelope<T> {
    /// Create a new message envelope
    pub fn new(message: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            timestamp: Utc::now(),
            message,
        }
    }

    /// Check if protocol version is compatible
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}
