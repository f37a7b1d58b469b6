//! Length-prefixed framing of jet messages.
//!
//! # Wire Format
//!
//! Messages are sent with a 4-byte length prefix (big-endian u32) followed
//! by the JSON-encoded payload:
//!
//! ```text
//! [4-byte length] [JSON data]
//! ```
//!
//! Both directions enforce [`MAX_MESSAGE_SIZE`]: an outbound payload larger
//! than the bound fails locally before any bytes are written, an inbound
//! header announcing more is treated as fatal by the connection.

use serde_json::Value;

use crate::protocol::consts::MAX_MESSAGE_SIZE;
use crate::protocol::error::{JetError, Result};

/// Size of the length prefix.
pub const HEADER_SIZE: usize = 4;

/// Encode a payload into a complete frame, length prefix included.
///
/// # Errors
///
/// Returns [`JetError::MessageTooLarge`] when the serialized payload
/// exceeds [`MAX_MESSAGE_SIZE`]; nothing is written in that case.
pub fn encode_message(value: &Value) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(JetError::MessageTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode the payload length announced by a frame header.
///
/// # Errors
///
/// Returns [`JetError::MessageTooLarge`] when the announced length exceeds
/// [`MAX_MESSAGE_SIZE`]. Callers must treat this as fatal and close the
/// connection instead of allocating the buffer.
pub fn decode_header(header: [u8; HEADER_SIZE]) -> Result<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(JetError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(len)
}

/// Parse a frame payload into a JSON value.
pub fn decode_payload(payload: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_round_trip() {
        let message = json!({
            "jsonrpc": "2.0",
            "method": "set",
            "params": {"path": "lcd/brightness", "value": [1, 2, null, "four"]},
            "id": 9,
        });
        let frame = encode_message(&message).unwrap();

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&frame[..HEADER_SIZE]);
        let len = decode_header(header).unwrap();
        assert_eq!(len, frame.len() - HEADER_SIZE);

        let decoded = decode_payload(&frame[HEADER_SIZE..]).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let frame = encode_message(&json!({})).unwrap();
        assert_eq!(&frame[..HEADER_SIZE], &[0, 0, 0, 2]);
        assert_eq!(&frame[HEADER_SIZE..], b"{}");
    }

    #[test]
    fn test_oversize_outbound_is_rejected() {
        let value = json!("x".repeat(MAX_MESSAGE_SIZE + 1));
        match encode_message(&value) {
            Err(JetError::MessageTooLarge { size, max }) => {
                assert!(size > MAX_MESSAGE_SIZE);
                assert_eq!(max, MAX_MESSAGE_SIZE);
            }
            other => panic!("expected MessageTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_maximum_size_payload_is_accepted() {
        // String payload of exactly MAX_MESSAGE_SIZE including the quotes.
        let value = json!("x".repeat(MAX_MESSAGE_SIZE - 2));
        let frame = encode_message(&value).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_oversize_header_is_rejected() {
        let announced = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
        assert!(matches!(
            decode_header(announced),
            Err(JetError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_garbage_payload_fails_to_decode() {
        assert!(decode_payload(b"{not json").is_err());
    }
}
