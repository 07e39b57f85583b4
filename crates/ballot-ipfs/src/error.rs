//! Error types for the ballot-ipfs crate

use ballot_cache::CacheError;
use cid::Cid;
use thiserror::Error;

/// Result type alias using `IpfsError`
pub type Result<T> = std::result::Result<T, IpfsError>;

/// Errors that can occur during content-addressed storage operations
#[derive(Error, Debug)]
pub enum IpfsError {
    /// Content not found
    #[error("content not found: {0}")]
    NotFound(Cid),

    /// Invalid CID
    #[error("invalid CID: {0}")]
    InvalidCid(String),

    /// Fetched content does not hash back to the requested CID
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Gateway fetch failed
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Upload to the pinning service failed
    #[error("upload failed: {0}")]
    Upload(String),

    /// Connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying cache error
    #[error("cache error: {0}")]
    Cache(CacheError),
}

impl IpfsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for IpfsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IpfsError::Timeout { seconds: 30 }
        } else if err.is_connect() {
            IpfsError::Connection(err.to_string())
        } else {
            IpfsError::Gateway(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IpfsError {
    fn from(err: serde_json::Error) -> Self {
        IpfsError::Serialization(err.to_string())
    }
}

/// Generators signal typed failures (e.g. `NotFound`) through their `anyhow`
/// error chain; resurface them instead of wrapping them as cache errors, so
/// callers can match on the error kind rather than on message strings.
impl From<CacheError> for IpfsError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Regeneration { key, source } => match source.downcast::<IpfsError>() {
                Ok(inner) => inner,
                Err(source) => IpfsError::Cache(CacheError::Regeneration { key, source }),
            },
            other => IpfsError::Cache(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid_utils::create_cid;

    #[test]
    fn test_not_found_survives_regeneration_wrapper() {
        let cid = create_cid(b"missing");
        let wrapped = CacheError::Regeneration {
            key: format!("ipfs-{}", cid),
            source: anyhow::Error::new(IpfsError::NotFound(cid)),
        };

        let resurfaced = IpfsError::from(wrapped);
        assert!(resurfaced.is_not_found());
    }

    #[test]
    fn test_foreign_regeneration_error_stays_a_cache_error() {
        let wrapped = CacheError::Regeneration {
            key: "ipfs-whatever".to_string(),
            source: anyhow::anyhow!("socket closed"),
        };

        let converted = IpfsError::from(wrapped);
        assert!(matches!(converted, IpfsError::Cache(CacheError::Regeneration { .. })));
        assert!(converted.to_string().contains("socket closed"));
    }
}
