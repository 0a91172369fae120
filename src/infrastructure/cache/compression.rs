//! Reduced storage form for large response payloads
//!
//! Long generated passages deflate well; entries at or above the configured
//! threshold are stored zlib-compressed and base64-armored so the payload
//! stays a plain `String`. The `compressed` flag on the entry records which
//! form it is in.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::domain::DomainError;

/// Compresses a response into its stored form
pub fn compress_response(response: &str) -> Result<String, DomainError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(response.as_bytes())
        .map_err(|e| DomainError::cache(format!("Failed to compress response: {}", e)))?;
    let bytes = encoder
        .finish()
        .map_err(|e| DomainError::cache(format!("Failed to compress response: {}", e)))?;

    Ok(BASE64.encode(bytes))
}

/// Reverses [`compress_response`]
pub fn decompress_response(stored: &str) -> Result<String, DomainError> {
    let bytes = BASE64
        .decode(stored)
        .map_err(|e| DomainError::cache(format!("Corrupt compressed payload: {}", e)))?;

    let mut response = String::new();
    ZlibDecoder::new(bytes.as_slice())
        .read_to_string(&mut response)
        .map_err(|e| DomainError::cache(format!("Corrupt compressed payload: {}", e)))?;

    Ok(response)
}
