//! Sans-I/O framing: turns a byte stream into frames and frames into
//! bytes, independent of whatever actually moves bytes across the wire.
//!
//! Keeping this separate from the socket means the TLS connection, a
//! loopback pair in a test, or an in-memory buffer can all drive the same
//! encode/decode logic.

use crate::catalogue::Opcode;
use crate::frame::{self, DecodedFrame, Decoder, HEADER_LEN};

/// Accumulates inbound bytes into frames and renders outbound frames into
/// bytes. Holds no socket of its own.
#[derive(Debug, Default)]
pub struct FrameCodec {
    decoder: Decoder,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self { decoder: Decoder::new() }
    }

    /// Feed newly-received bytes and get back any frames they completed.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<DecodedFrame> {
        self.decoder.feed(bytes)
    }

    /// Render a command frame ready to write to the wire.
    pub fn encode_command(&self, opcode: Opcode, message_id: u16, payload: &[u8]) -> Vec<u8> {
        frame::encode_command(opcode, message_id, payload)
    }

    /// Render a RESPONSE frame ready to write to the wire.
    pub fn encode_response(&self, message_id: u16, status_or_length: u32) -> [u8; HEADER_LEN] {
        frame::encode_response(message_id, status_or_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_roundtrips_through_its_own_encode_decode() {
        let codec = FrameCodec::new();
        let bytes = codec.encode_command(Opcode::Login, 11, b"a@b.com\x00pw");

        let mut receiver = FrameCodec::new();
        let frames = receiver.decode(&bytes);
        assert_eq!(
            frames,
            vec![DecodedFrame::Command { opcode: Opcode::Login, id: 11, payload: b"a@b.com\x00pw".to_vec() }]
        );
    }

    #[test]
    fn codec_splits_arrivals_across_multiple_decode_calls() {
        let codec = FrameCodec::new();
        let bytes = codec.encode_response(4, 200);

        let mut receiver = FrameCodec::new();
        assert!(receiver.decode(&bytes[..3]).is_empty());
        let frames = receiver.decode(&bytes[3..]);
        assert_eq!(frames, vec![DecodedFrame::Response { id: 4, code: 200 }]);
    }
}
