//! Wire framing
//!
//! ```text
//! Data frame:  [ id:u32 LE ][ length:u32 LE ][ payload: length bytes ]
//! ACK frame:   [ id:u32 LE ]
//! ```
//!
//! An ACK is never followed by a payload. The two frame kinds are told apart
//! only by direction: data flows writer -> reader, ACKs flow reader -> writer.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Size of a data frame header
pub const HEADER_LEN: usize = 8;

/// Size of an acknowledgment frame
pub const ACK_LEN: usize = 4;

/// Decoded data frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: u32,
    pub length: u32,
}

impl FrameHeader {
    /// Reject a declared length above `max_message_size`
    pub fn check_length(&self, max_message_size: usize) -> Result<usize> {
        let length = self.length as usize;
        if length > max_message_size {
            return Err(TransportError::FrameTooLarge {
                id: self.id,
                length: self.length,
                max: max_message_size,
            });
        }
        Ok(length)
    }
}

/// A complete data frame as seen by the reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    pub payload: Bytes,
}

/// Encode a data frame into one contiguous buffer so it can be written
/// with a single call.
pub fn encode(id: u32, payload: &[u8], max_message_size: usize) -> Result<Bytes> {
    if payload.len() > max_message_size || u32::try_from(payload.len()).is_err() {
        return Err(TransportError::MessageTooLarge {
            size: payload.len(),
            max: max_message_size,
        });
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u32_le(id);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a header into message ID and declared payload length
pub fn decode_header(header: &[u8; HEADER_LEN]) -> FrameHeader {
    let mut buf = &header[..];
    let id = buf.get_u32_le();
    let length = buf.get_u32_le();
    FrameHeader { id, length }
}

/// Encode the acknowledgment for message `id`
pub fn encode_ack(id: u32) -> [u8; ACK_LEN] {
    id.to_le_bytes()
}

/// Decode an acknowledgment frame
pub fn decode_ack(ack: &[u8; ACK_LEN]) -> u32 {
    u32::from_le_bytes(*ack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let frame = encode(1, b"Hello, World!", 1024).unwrap();

        assert_eq!(frame.len(), HEADER_LEN + 13);
        assert_eq!(&frame[..4], &[1, 0, 0, 0]);
        assert_eq!(&frame[4..8], &[13, 0, 0, 0]);
        assert_eq!(&frame[8..], b"Hello, World!");
    }

    #[test]
    fn test_encode_is_little_endian() {
        let frame = encode(0x0102_0304, &[], 16).unwrap();
        assert_eq!(&frame[..], &[4, 3, 2, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; 17];
        let err = encode(1, &payload, 16).unwrap_err();
        assert!(matches!(err, TransportError::MessageTooLarge { size: 17, max: 16 }));

        // Exactly at the limit is fine
        assert!(encode(1, &payload[..16], 16).is_ok());
    }

    #[test]
    fn test_decode_header() {
        let header = decode_header(&[7, 0, 0, 0, 0, 1, 0, 0]);
        assert_eq!(header, FrameHeader { id: 7, length: 256 });
    }

    #[test]
    fn test_check_length() {
        let header = FrameHeader { id: 9, length: 11 };
        assert_eq!(header.check_length(11).unwrap(), 11);

        let err = header.check_length(10).unwrap_err();
        assert!(matches!(
            err,
            TransportError::FrameTooLarge { id: 9, length: 11, max: 10 }
        ));
    }

    #[test]
    fn test_ack_encoding() {
        assert_eq!(encode_ack(1), [1, 0, 0, 0]);
        assert_eq!(decode_ack(&[0xff, 0xff, 0xff, 0xff]), u32::MAX);
    }
}
