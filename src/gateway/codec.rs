//! Content decoding for canister response bodies.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use thiserror::Error;

/// Errors raised while decoding a body.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported encoding: \"{0}\"")]
    UnsupportedEncoding(String),

    #[error("Failed to decode {encoding} body: {source}")]
    Corrupt {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Decode `body` according to its `Content-Encoding` token.
///
/// `identity` and the empty token return the input unchanged. Any token other
/// than `gzip` or `deflate` is rejected; undecoded bytes are never passed on.
pub fn decode_body(body: &[u8], encoding: &str) -> Result<Vec<u8>, CodecError> {
    match encoding {
        "identity" | "" => Ok(body.to_vec()),
        "gzip" => read_all(GzDecoder::new(body), "gzip"),
        "deflate" => read_all(ZlibDecoder::new(body), "deflate"),
        other => Err(CodecError::UnsupportedEncoding(other.to_string())),
    }
}

fn read_all(mut reader: impl Read, encoding: &'static str) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|source| CodecError::Corrupt { encoding, source })?;
    Ok(out)
}
