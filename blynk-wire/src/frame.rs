//! Frame encoding and incremental decoding.
//!
//! Every message on the wire starts with a 7-byte header: a one-byte
//! opcode, a big-endian `u16` message id and a big-endian `u32` that is
//! either a response status code (opcode 0) or a payload length (every
//! other opcode). There is a second, 5-byte header variant used by some
//! hardware-side libraries with a `u16` length field instead; the core
//! only ever speaks the 7-byte form, see [`encode_hardware`].

use crate::catalogue::Opcode;

/// Size in bytes of the header the core reads and writes.
pub const HEADER_LEN: usize = 7;

/// Frames claiming a longer body than this are corrupt framing, not a
/// legitimately huge message. Treated as a resync point, never trusted.
pub const MAX_PAYLOAD_LEN: u32 = 10_000_000;

/// A fully decoded frame handed to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    /// A RESPONSE frame (opcode 0): carries a status code and no body.
    Response { id: u16, code: i32 },
    /// Any other recognised opcode, with its raw (still compressed, if
    /// applicable) body.
    Command { opcode: Opcode, id: u16, payload: Vec<u8> },
}

/// Encode a non-RESPONSE frame: header followed by `payload` verbatim.
pub fn encode_command(opcode: Opcode, message_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(u8::from(opcode));
    out.extend_from_slice(&message_id.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Encode a RESPONSE frame: always exactly [`HEADER_LEN`] bytes, body-less.
pub fn encode_response(message_id: u16, status_or_length: u32) -> [u8; HEADER_LEN] {
    let mut out = [0u8; HEADER_LEN];
    out[1..3].copy_from_slice(&message_id.to_be_bytes());
    out[3..7].copy_from_slice(&status_or_length.to_be_bytes());
    out
}

/// 5-byte-header encoding some hardware-side libraries use on raw TCP.
/// Never produced or consumed by the rest of this crate; kept only so a
/// caller bridging to one of those libraries has something to call.
pub fn encode_hardware(command: u8, message_id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.push(command);
    out.extend_from_slice(&message_id.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Incremental frame decoder fed from an arbitrarily-chunked byte stream.
///
/// Holds whatever tail of the stream hasn't formed a complete frame yet.
/// Callers push bytes in with [`feed`](Decoder::feed) as they arrive off
/// the socket and get back zero or more fully decoded frames.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` to the internal buffer and decode as many frames as
    /// are now complete. Frames with an oversized length field are logged
    /// and skipped (header only); frames with an opcode outside the known
    /// catalogue are logged and skipped (header and body). Neither case
    /// is reported to the caller as an error — the stream resyncs itself.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedFrame> {
        self.buf.extend_from_slice(bytes);

        let mut out = Vec::new();
        let mut pos = 0usize;

        loop {
            let remaining = &self.buf[pos..];
            if remaining.len() < HEADER_LEN {
                break;
            }

            let command = remaining[0];
            let message_id = u16::from_be_bytes([remaining[1], remaining[2]]);
            let status_or_length =
                u32::from_be_bytes([remaining[3], remaining[4], remaining[5], remaining[6]]);

            if command == u8::from(Opcode::Response) {
                out.push(DecodedFrame::Response { id: message_id, code: status_or_length as i32 });
                pos += HEADER_LEN;
                continue;
            }

            if status_or_length > MAX_PAYLOAD_LEN {
                tracing::warn!(
                    command,
                    message_id,
                    length = status_or_length,
                    "frame length exceeds sanity cap, dropping header and resyncing"
                );
                pos += HEADER_LEN;
                continue;
            }

            let total = HEADER_LEN + status_or_length as usize;
            if remaining.len() < total {
                break;
            }

            let payload = remaining[HEADER_LEN..total].to_vec();
            pos += total;

            match Opcode::try_from(command) {
                Ok(opcode) => out.push(DecodedFrame::Command { opcode, id: message_id, payload }),
                Err(err) => tracing::debug!(%err, message_id, "dropping frame with unknown opcode"),
            }
        }

        self.buf.drain(..pos);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_response_frame() {
        let mut dec = Decoder::new();
        let frames = dec.feed(&encode_response(7, 200));
        assert_eq!(frames, vec![DecodedFrame::Response { id: 7, code: 200 }]);
    }

    #[test]
    fn decodes_command_frame() {
        let mut dec = Decoder::new();
        let bytes = encode_command(Opcode::Login, 3, b"a@b.com\x00pw");
        let frames = dec.feed(&bytes);
        assert_eq!(
            frames,
            vec![DecodedFrame::Command { opcode: Opcode::Login, id: 3, payload: b"a@b.com\x00pw".to_vec() }]
        );
    }

    #[test]
    fn decodes_across_arbitrary_chunk_boundaries() {
        let bytes = encode_command(Opcode::Hardware, 9, b"1\x00vw\x001\x00255");
        let mut dec = Decoder::new();
        let mut frames = Vec::new();
        for chunk in bytes.chunks(3) {
            frames.extend(dec.feed(chunk));
        }
        assert_eq!(
            frames,
            vec![DecodedFrame::Command { opcode: Opcode::Hardware, id: 9, payload: b"1\x00vw\x001\x00255".to_vec() }]
        );
    }

    #[test]
    fn decodes_multiple_frames_in_one_feed() {
        let mut bytes = encode_response(1, 200).to_vec();
        bytes.extend(encode_command(Opcode::Ping, 2, b""));
        let mut dec = Decoder::new();
        let frames = dec.feed(&bytes);
        assert_eq!(
            frames,
            vec![
                DecodedFrame::Response { id: 1, code: 200 },
                DecodedFrame::Command { opcode: Opcode::Ping, id: 2, payload: vec![] },
            ]
        );
    }

    #[test]
    fn oversized_length_resyncs_instead_of_hanging() {
        let mut header = vec![Opcode::Login as u8];
        header.extend_from_slice(&5u16.to_be_bytes());
        header.extend_from_slice(&(MAX_PAYLOAD_LEN + 1).to_be_bytes());

        let mut dec = Decoder::new();
        let frames = dec.feed(&header);
        assert!(frames.is_empty());

        // The next real frame, appended right after the bogus header, decodes fine.
        let next = encode_response(9, 200);
        let frames = dec.feed(&next);
        assert_eq!(frames, vec![DecodedFrame::Response { id: 9, code: 200 }]);
    }

    #[test]
    fn unknown_opcode_is_dropped_silently() {
        let mut bytes = vec![5u8]; // not in the catalogue
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(b"abc");
        bytes.extend(encode_response(2, 200));

        let mut dec = Decoder::new();
        let frames = dec.feed(&bytes);
        assert_eq!(frames, vec![DecodedFrame::Response { id: 2, code: 200 }]);
    }

    #[test]
    fn response_frame_is_always_exactly_header_len() {
        let bytes = encode_response(42, 9_999_999);
        assert_eq!(bytes.len(), HEADER_LEN);
    }
}
