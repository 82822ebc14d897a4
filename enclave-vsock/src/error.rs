//! Transport error types

use bytes::Bytes;
use thiserror::Error;

/// Result alias used throughout the transport
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport error types
#[derive(Debug, Error)]
pub enum TransportError {
    /// Outbound payload larger than the configured ceiling
    #[error("message size exceeds maximum allowed size: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Inbound frame header declared a length larger than the ceiling
    #[error("frame {id} declares length {length}, maximum allowed size is {max}")]
    FrameTooLarge { id: u32, length: u32, max: usize },

    /// Peer closed the connection (end of stream)
    #[error("Connection closed")]
    ConnectionClosed,

    /// IO error on the underlying connection
    #[error("IO error: {0}")]
    Io(std::io::Error),

    /// The frame was decoded but the acknowledgment could not be written back.
    /// The decoded payload is kept so the caller can still use it.
    #[error("failed to acknowledge message {id}: {source}")]
    AckFailed {
        id: u32,
        payload: Bytes,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Protocol version mismatch
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    ProtocolVersionMismatch { expected: u32, actual: u32 },

    /// The writer was closed before the message could be sent
    #[error("writer closed, message was not sent")]
    Cancelled,

    /// No acknowledgment arrived within the allotted time
    #[error("timed out waiting for acknowledgment of message {id}")]
    AckTimeout { id: u32 },

    /// The message is not (or no longer) tracked by the store
    #[error("message {id} is not tracked")]
    UnknownMessage { id: u32 },
}

impl TransportError {
    /// Payload or declared frame length exceeded the maximum message size
    pub fn is_size_violation(&self) -> bool {
        matches!(
            self,
            TransportError::MessageTooLarge { .. } | TransportError::FrameTooLarge { .. }
        )
    }

    /// Failure of the underlying connection, including end of stream
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::ConnectionClosed
                | TransportError::AckFailed { .. }
        )
    }

    /// The writer shut down before the message was handed to the transport
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::ConnectionClosed
                | TransportError::AckTimeout { .. }
        )
    }

    /// Check if this error indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::ProtocolVersionMismatch { .. })
    }

    /// Recover the decoded payload from an acknowledgment failure
    pub fn into_payload(self) -> Option<Bytes> {
        match self {
            TransportError::AckFailed { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            TransportError::ConnectionClosed
        } else {
            TransportError::Io(err)
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            TransportError::Io(err.into())
        } else if err.is_data() || err.is_syntax() || err.is_eof() {
            TransportError::Deserialization(err.to_string())
        } else {
            TransportError::Serialization(err.to_string())
        }
    }
}
