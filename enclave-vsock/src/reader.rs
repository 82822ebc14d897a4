//! Receiving side: read one frame, acknowledge it, hand back the payload

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::codec::{self, Frame, HEADER_LEN};
use crate::config::ChannelConfig;
use crate::error::{Result, TransportError};
use crate::protocol::{MessageEnvelope, PROTOCOL_VERSION};

/// Reads frames from a connection and acknowledges each one.
///
/// The acknowledgment is written inline, before the payload is returned. A
/// reader that is never asked to read never acknowledges anything.
#[derive(Debug)]
pub struct AckReader<C> {
    conn: C,
    max_message_size: usize,
}

impl<C> AckReader<C>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a reader with the default limits
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, &ChannelConfig::default())
    }

    /// Create a reader with explicit limits
    pub fn with_config(conn: C, config: &ChannelConfig) -> Self {
        Self {
            conn,
            max_message_size: config.max_message_size,
        }
    }

    /// Read the next frame and acknowledge it.
    ///
    /// A declared length above the limit fails before any payload byte is
    /// read. If the payload was decoded but the ACK write failed, the error
    /// is [`TransportError::AckFailed`] and still carries the payload.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_LEN];
        self.conn.read_exact(&mut header).await?;

        let header = codec::decode_header(&header);
        let length = header.check_length(self.max_message_size).inspect_err(|e| {
            warn!(message_id = header.id, length = header.length, error = %e, "Rejecting oversized frame");
        })?;

        let mut payload = BytesMut::zeroed(length);
        if length > 0 {
            self.conn.read_exact(&mut payload[..]).await?;
        }
        let payload = payload.freeze();
        debug!(message_id = header.id, length, "Received frame");

        if let Err(source) = self.acknowledge(header.id).await {
            warn!(message_id = header.id, error = %source, "Failed to send acknowledgment");
            return Err(TransportError::AckFailed {
                id: header.id,
                payload,
                source,
            });
        }

        Ok(Frame {
            id: header.id,
            payload,
        })
    }

    /// Read the next payload, acknowledging its frame
    pub async fn read(&mut self) -> Result<Bytes> {
        Ok(self.read_frame().await?.payload)
    }

    /// Read the next payload and decode it as JSON.
    ///
    /// The frame is acknowledged even when decoding fails; the reader stays
    /// usable for the following frames.
    pub async fn read_message<T>(&mut self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let payload = self.read().await?;
        serde_json::from_slice(&payload)
            .map_err(|e| TransportError::Deserialization(e.to_string()))
    }

    /// Read an enveloped message and check its protocol version
    pub async fn read_envelope<T>(&mut self) -> Result<MessageEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let envelope: MessageEnvelope<T> = self.read_message().await?;
        if !envelope.is_compatible() {
            return Err(TransportError::ProtocolVersionMismatch {
                expected: PROTOCOL_VERSION,
                actual: envelope.protocol_version,
            });
        }
        Ok(envelope)
    }

    /// Borrow the underlying connection
    pub fn get_ref(&self) -> &C {
        &self.conn
    }

    /// Give back the underlying connection
    pub fn into_inner(self) -> C {
        self.conn
    }

    async fn acknowledge(&mut self, id: u32) -> std::io::Result<()> {
        self.conn.write_all(&codec::encode_ack(id)).await?;
        self.conn.flush().await?;
        trace!(message_id = id, "Acknowledged frame");
        Ok(())
    }
}
