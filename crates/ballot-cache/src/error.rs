//! Error types for the ballot-cache crate

use thiserror::Error;

/// Result type alias using `CacheError`
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations
///
/// Store I/O failures (`Read`/`Write`) are a different failure class from a
/// generator that cannot produce fresh data (`Regeneration`): the stale
/// fallback in `get_and_cache` only ever suppresses the latter.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend read failed (distinct from an absent key, which is `Ok(None)`)
    #[error("cache read failed for '{key}': {message}")]
    Read { key: String, message: String },

    /// Backend write failed
    #[error("cache write failed for '{key}': {message}")]
    Write { key: String, message: String },

    /// The caller-supplied generator failed and no stale fallback applied
    #[error("failed to regenerate cache value '{key}': {source}")]
    Regeneration { key: String, source: anyhow::Error },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Check if this error wraps a failed regeneration
    pub fn is_regeneration(&self) -> bool {
        matches!(self, Self::Regeneration { .. })
    }

    /// Build a read error for `key` from any displayable cause
    pub fn read(key: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Read {
            key: key.into(),
            message: cause.to_string(),
        }
    }

    /// Build a write error for `key` from any displayable cause
    pub fn write(key: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Write {
            key: key.into(),
            message: cause.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            CacheError::Serialization(err.to_string())
        } else if err.is_data() || err.is_syntax() || err.is_eof() {
            CacheError::Deserialization(err.to_string())
        } else {
            CacheError::Serialization(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regeneration_preserves_cause() {
        let err = CacheError::Regeneration {
            key: "round-42".to_string(),
            source: anyhow::anyhow!("upstream timed out"),
        };

        assert!(err.is_regeneration());
        assert!(err.to_string().contains("round-42"));
        assert!(err.to_string().contains("upstream timed out"));
    }

    #[test]
    fn test_read_and_write_are_distinct() {
        let read = CacheError::read("k", "throttled");
        let write = CacheError::write("k", "disk full");

        assert!(matches!(read, CacheError::Read { .. }));
        assert!(matches!(write, CacheError::Write { .. }));
        assert!(!read.is_regeneration());
    }
}
