//! Error types for blynk-client.

use std::{fmt, io};

use blynk_wire::{DecompressError, ResponseCode, UnknownOpcode};

/// The error type returned from any [`crate::Connector`] method that talks
/// to the server.
#[derive(Debug)]
pub enum Error {
    /// TLS/transport failed to establish, including a `WAITING` state that
    /// ran past its forced deadline.
    Connect(String),
    /// A send was attempted with no live transport.
    NotConnected,
    /// `LOGIN`/`SHARE_LOGIN` returned a non-OK status.
    Auth(ResponseCode),
    /// Any other non-OK response to a `ResponseOnly` request.
    Server(ResponseCode),
    /// The deadline expired before a reply arrived.
    Timeout,
    /// The transport terminated while this request was still pending.
    ConnectionClosed,
    /// A domain record failed to serialize into a frame body.
    Encode(String),
    /// A frame body failed to deserialize into a domain record.
    Decode(String),
    /// A profile or graph payload could not be decompressed.
    Decompress(String),
    /// The correlator's 16-bit id space is exhausted.
    Saturated,
    /// The controller was disconnected while this request was pending.
    Cancelled,
    /// Network I/O failure not otherwise classified above.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "connect failed: {msg}"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Auth(code) => write!(f, "authentication rejected: {code}"),
            Self::Server(code) => write!(f, "server error: {code}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::ConnectionClosed => write!(f, "connection closed while request was pending"),
            Self::Encode(msg) => write!(f, "encode error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Decompress(msg) => write!(f, "decompress error: {msg}"),
            Self::Saturated => write!(f, "request id space exhausted"),
            Self::Cancelled => write!(f, "request cancelled by disconnect"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecompressError> for Error {
    fn from(e: DecompressError) -> Self {
        Self::Decompress(e.to_string())
    }
}

impl From<UnknownOpcode> for Error {
    fn from(e: UnknownOpcode) -> Self {
        Self::Decode(e.to_string())
    }
}

impl Error {
    /// `true` if this error means the caller should give up on the current
    /// connection and wait for the reconnect loop rather than retry the
    /// request directly.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::NotConnected | Self::Io(_))
    }
}
