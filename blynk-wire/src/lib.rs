//! Wire-level primitives for talking to a Blynk-family legacy IoT control
//! server: frame encoding/decoding, the opcode and response-code
//! catalogues, and best-effort body decompression.
//!
//! This crate knows nothing about sockets, TLS, or authentication; see
//! `blynk-client` for the connection that sits on top of it.

pub mod catalogue;
pub mod decompress;
pub mod frame;
pub mod transport;

pub use catalogue::{Opcode, ResponseCode, UnknownOpcode};
pub use decompress::{maybe_decompress, DecompressError};
pub use frame::{encode_command, encode_hardware, encode_response, DecodedFrame, Decoder, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use transport::FrameCodec;
