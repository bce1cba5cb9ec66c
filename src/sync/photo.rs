//! Photo payload handling for outbound records.
//!
//! Pet records may embed a base64-encoded photo. Before a record is
//! transmitted the engine hands the payload to a compressor; if that fails,
//! the photo field is dropped from the transmitted copy and the rest of the
//! record still syncs. Only the photo is lost, never the record.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;

use crate::db::Record;

/// Record field holding the embedded photo payload.
pub const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("invalid photo payload: {0}")]
    Invalid(String),
    #[error("photo payload too large: {0} bytes")]
    TooLarge(usize),
}

/// Compresses an embedded photo payload before transmission. May fail;
/// failure is non-fatal to the enclosing record transfer.
pub trait PhotoCompressor: Send + Sync {
    fn compress(&self, payload: &str) -> Result<String, PhotoError>;
}

/// Default compressor: validates the payload decodes as base64 and enforces
/// a size ceiling. Oversized or undecodable payloads are rejected, which
/// triggers the engine's degradation policy.
pub struct SizeCapCompressor {
    max_bytes: usize,
}

impl SizeCapCompressor {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for SizeCapCompressor {
    fn default() -> Self {
        // 512 KiB of decoded image data
        Self::new(512 * 1024)
    }
}

impl PhotoCompressor for SizeCapCompressor {
    fn compress(&self, payload: &str) -> Result<String, PhotoError> {
        let decoded = BASE64
            .decode(payload.trim())
            .map_err(|e| PhotoError::Invalid(e.to_string()))?;

        if decoded.len() > self.max_bytes {
            return Err(PhotoError::TooLarge(decoded.len()));
        }

        // Re-encode so the transmitted payload is canonical base64.
        Ok(BASE64.encode(decoded))
    }
}

/// Applies the degradation policy to one outbound record.
///
/// Returns the record to transmit: photo compressed in place on success,
/// photo field removed on failure.
pub fn prepare_photo(
    record: &Record,
    compressor: &dyn PhotoCompressor,
) -> (Record, Option<PhotoError>) {
    let Some(Value::String(payload)) = record.get(PHOTO_FIELD) else {
        return (record.clone(), None);
    };

    let mut out = record.clone();
    match compressor.compress(payload) {
        Ok(compressed) => {
            out.insert(PHOTO_FIELD.to_string(), Value::String(compressed));
            (out, None)
        }
        Err(e) => {
            out.remove(PHOTO_FIELD);
            (out, Some(e))
        }
    }
}
