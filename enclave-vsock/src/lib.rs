//! Acknowledged message transport between host and confidential guest
//!
//! This crate turns an ordered byte stream (a vsock connection in
//! production) into a framed channel with per-message delivery tracking:
//!
//! - [`codec`]: `[id][length][payload]` data frames and 4-byte ACK frames
//! - [`AckReader`]: reads a frame, writes its ACK back, returns the payload
//! - [`AckWriter`]: numbers and queues payloads, sends them from a single
//!   background task and records ACKs in a bounded [`MessageStore`]
//! - [`protocol`]: JSON payloads exchanged by the manager and the agent

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod store;
pub mod writer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use codec::{Frame, FrameHeader};
pub use config::{ChannelConfig, MAX_CONCURRENT, MAX_MESSAGE_SIZE};
pub use error::{Result, TransportError};
pub use protocol::{
    AgentMessage, ComputationSpec, ManagerMessage, MessageEnvelope, PROTOCOL_VERSION,
};
pub use reader::AckReader;
pub use store::{Message, MessageStatus, MessageStore, StatusCounts};
pub use writer::{AckWriter, SendReceipt};
