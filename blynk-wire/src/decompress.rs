//! Best-effort decompression of payload bodies.
//!
//! Certain server responses (bulk profile/dashboard dumps) arrive
//! compressed, but nothing in the frame header says so explicitly.
//! Compression is instead detected from the leading bytes of the body.

use std::io::Read;

/// Errors produced while inflating a compressed body.
#[derive(Debug)]
pub struct DecompressError(std::io::Error);

impl std::fmt::Display for DecompressError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to decompress payload: {}", self.0)
    }
}
impl std::error::Error for DecompressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Inflate `body` if it looks like zlib or gzip, otherwise return it
/// unchanged. Detection is by leading-byte signature only:
///
/// - `0x1f 0x8b` — gzip
/// - `0x78` followed by a valid zlib `FLG` checkbyte — zlib
/// - anything else — passed through untouched
pub fn maybe_decompress(body: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if is_gzip(body) {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(body)
            .read_to_end(&mut out)
            .map_err(DecompressError)?;
        return Ok(out);
    }

    if is_zlib(body) {
        let mut out = Vec::new();
        flate2::read::ZlibDecoder::new(body)
            .read_to_end(&mut out)
            .map_err(DecompressError)?;
        return Ok(out);
    }

    Ok(body.to_vec())
}

fn is_gzip(body: &[u8]) -> bool {
    body.len() >= 2 && body[0] == 0x1f && body[1] == 0x8b
}

fn is_zlib(body: &[u8]) -> bool {
    // RFC 1950: CMF/FLG pair, CMF low nibble 8 (deflate), and the 16-bit
    // big-endian header must be a multiple of 31.
    if body.len() < 2 {
        return false;
    }
    let cmf = body[0];
    let flg = body[1];
    if cmf & 0x0f != 8 {
        return false;
    }
    u16::from_be_bytes([cmf, flg]) % 31 == 0
}
