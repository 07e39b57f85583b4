//! # Ballot Cache
//!
//! Staleness-aware object cache for voting metadata.
//!
//! This crate provides:
//! - **Store operations**: Read and write byte payloads with a MIME type and
//!   a last-modified timestamp, keyed by arbitrary cache keys
//! - **Staleness policy**: Pure decision logic for fresh/stale/absent entries
//! - **Generator-based population**: `get_and_cache` regenerates missing or
//!   expired entries through a caller-supplied async generator
//! - **Graceful degradation**: Opt-in fallback to the stale cached value when
//!   regeneration fails
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Application Layer              │
//! ├─────────────────────────────────────────────┤
//! │    ObjectCache Trait (get_and_cache)        │
//! ├──────────────┬──────────────┬───────────────┤
//! │ FileSystem-  │   S3Object-  │ MemoryObject- │
//! │ ObjectCache  │    Cache     │    Cache      │
//! ├──────────────┴──────────────┴───────────────┤
//! │     Filesystem / Remote object storage      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ballot_cache::{FileSystemObjectCache, ObjectCache};
//!
//! let cache = FileSystemObjectCache::new("/tmp/metadata-cache");
//! let rounds: Vec<VotingRound> = cache
//!     .get_and_cache("voting-rounds", |_existing| fetch_rounds(), Some(300), true)
//!     .await?;
//! ```

pub mod entry;
pub mod error;
pub mod fs;
pub mod memory;
pub mod s3;
pub mod staleness;

pub use entry::{extension_for_mime, mime_for_extension, CachedObject, JSON_MIME, OCTET_STREAM_MIME};
pub use error::{CacheError, Result};
pub use fs::FileSystemObjectCache;
pub use memory::MemoryObjectCache;
pub use s3::{S3CacheConfig, S3Client, S3ObjectCache};
pub use staleness::Staleness;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};

/// Trait for object cache backends
///
/// Backends implement only [`read`](Self::read) and [`write`](Self::write);
/// the staleness-aware population logic is provided once for all of them.
///
/// There is no cross-call locking: two concurrent `get_and_cache` calls for
/// the same key can both observe a stale entry, both invoke their generator,
/// and both write. The last write wins. Keys are otherwise independent.
#[async_trait]
pub trait ObjectCache: Send + Sync {
    /// Read the entry for `cache_key`
    ///
    /// Returns `Ok(None)` when the key has never been written. A transient
    /// backend failure is an error, never conflated with an absent key.
    async fn read(&self, cache_key: &str) -> Result<Option<CachedObject>>;

    /// Durably persist `data` under `cache_key`, overwriting any prior value
    /// and resetting the entry's last-modified time to now
    async fn write(&self, cache_key: &str, data: &[u8], mime_type: &str) -> Result<()>;

    /// Persist a JSON-serializable value under `cache_key`
    async fn put<T>(&self, cache_key: &str, data: &T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let body = serde_json::to_vec_pretty(data)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.write(cache_key, &body, JSON_MIME).await
    }

    /// Persist raw bytes with an explicit MIME type under `cache_key`
    async fn put_buffer(&self, cache_key: &str, data: &[u8], mime_type: &str) -> Result<()> {
        self.write(cache_key, data, mime_type).await
    }

    /// Get a JSON value, regenerating it when missing or stale
    ///
    /// - A fresh entry is returned directly; `generator` is not invoked.
    /// - A missing or expired entry invokes `generator` with the decoded
    ///   existing value (if any). On success the new value is written back
    ///   and returned as-is.
    /// - When `generator` fails and an entry exists and `return_stale_result`
    ///   is true, the failure is logged and the stale value is returned
    ///   instead. Store I/O errors always propagate regardless.
    ///
    /// `stale_after_seconds` of `None` means entries never expire; `Some(0)`
    /// means every call regenerates.
    async fn get_and_cache<T, F, Fut>(
        &self,
        cache_key: &str,
        generator: F,
        stale_after_seconds: Option<u64>,
        return_stale_result: bool,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce(Option<T>) -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send,
    {
        let cached = self.read(cache_key).await?;
        let decision = staleness::evaluate(
            cached.as_ref().map(|e| e.last_modified),
            stale_after_seconds,
            Utc::now(),
        );

        if let Some(existing) = &cached {
            if decision == Staleness::Fresh {
                debug!(
                    key = cache_key,
                    stale_after_seconds,
                    "found cached value within threshold, using it"
                );
                return decode_json(&existing.data, cache_key);
            }
        }

        match &cached {
            None => debug!(key = cache_key, "cache value empty; getting data for the first time"),
            Some(existing) => debug!(
                key = cache_key,
                last_modified = %existing.last_modified,
                "cache value expired"
            ),
        }

        let existing_value = match &cached {
            Some(entry) => Some(decode_json::<T>(&entry.data, cache_key)?),
            None => None,
        };

        match generator(existing_value).await {
            Ok(value) => {
                self.put(cache_key, &value).await?;
                debug!(key = cache_key, "cached value written");
                Ok(value)
            }
            Err(err) => match &cached {
                Some(existing) if return_stale_result => {
                    warn!(
                        key = cache_key,
                        error = %err,
                        "failed to repopulate cache value; failing gracefully and using the cache"
                    );
                    decode_json(&existing.data, cache_key)
                }
                _ => Err(CacheError::Regeneration {
                    key: cache_key.to_string(),
                    source: err,
                }),
            },
        }
    }

    /// Byte-oriented variant of [`get_and_cache`](Self::get_and_cache)
    ///
    /// Carries `(payload, mime_type)` through the same state machine, for
    /// non-JSON payloads such as uploaded files.
    async fn get_and_cache_buffer<F, Fut>(
        &self,
        cache_key: &str,
        generator: F,
        stale_after_seconds: Option<u64>,
        return_stale_result: bool,
    ) -> Result<(Bytes, String)>
    where
        F: FnOnce(Option<(Bytes, String)>) -> Fut + Send,
        Fut: Future<Output = anyhow::Result<(Bytes, String)>> + Send,
    {
        let cached = self.read(cache_key).await?;
        let decision = staleness::evaluate(
            cached.as_ref().map(|e| e.last_modified),
            stale_after_seconds,
            Utc::now(),
        );

        if let Some(existing) = &cached {
            if decision == Staleness::Fresh {
                debug!(
                    key = cache_key,
                    stale_after_seconds,
                    "found cached buffer within threshold, using it"
                );
                return Ok((existing.data.clone(), existing.mime_type.clone()));
            }
        }

        match &cached {
            None => debug!(key = cache_key, "cached buffer empty; getting data for the first time"),
            Some(existing) => debug!(
                key = cache_key,
                last_modified = %existing.last_modified,
                "cached buffer expired"
            ),
        }

        let existing_value = cached
            .as_ref()
            .map(|entry| (entry.data.clone(), entry.mime_type.clone()));

        match generator(existing_value).await {
            Ok((data, mime_type)) => {
                self.write(cache_key, &data, &mime_type).await?;
                debug!(key = cache_key, mime_type = %mime_type, "cached buffer written");
                Ok((data, mime_type))
            }
            Err(err) => match &cached {
                Some(existing) if return_stale_result => {
                    warn!(
                        key = cache_key,
                        error = %err,
                        "failed to repopulate cached buffer; failing gracefully and using the cache"
                    );
                    Ok((existing.data.clone(), existing.mime_type.clone()))
                }
                _ => Err(CacheError::Regeneration {
                    key: cache_key.to_string(),
                    source: err,
                }),
            },
        }
    }
}

fn decode_json<T: DeserializeOwned>(data: &[u8], cache_key: &str) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| {
        CacheError::Deserialization(format!("cached value '{}' is not valid JSON: {}", cache_key, e))
    })
}
