//! Cached entry type and MIME/extension mapping

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// MIME type used for JSON-shaped cache entries
pub const JSON_MIME: &str = "application/json";

/// Fallback MIME type for entries whose type cannot be determined
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// A single cache entry as returned by [`ObjectCache::read`](crate::ObjectCache::read)
///
/// A key maps to at most one live entry; every write overwrites the previous
/// payload and resets `last_modified` to the write time.
#[derive(Clone, Debug)]
pub struct CachedObject {
    /// The stored payload bytes
    pub data: Bytes,
    /// MIME type recorded at write time
    pub mime_type: String,
    /// When the entry was last written
    pub last_modified: DateTime<Utc>,
}

impl CachedObject {
    /// Create an entry stamped with the current time
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            last_modified: Utc::now(),
        }
    }

    /// Entry size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Derive a file extension from a MIME type (e.g. `application/json` -> `json`)
pub fn extension_for_mime(mime_type: &str) -> String {
    match mime_type {
        JSON_MIME => "json".to_string(),
        OCTET_STREAM_MIME => "bin".to_string(),
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string()),
    }
}

/// Derive a MIME type from a file extension (e.g. `json` -> `application/json`)
pub fn mime_for_extension(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first_raw()
        .unwrap_or(OCTET_STREAM_MIME)
        .to_string()
}
