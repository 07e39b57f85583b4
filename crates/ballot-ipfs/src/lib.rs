//! # Ballot IPFS
//!
//! Content-addressed metadata storage for voting rounds.
//!
//! This crate provides:
//! - **CID generation**: CIDv1/raw/sha2-256 identifiers over payload bytes
//! - **IpfsStore trait**: get/put for JSON documents and raw buffers, keyed
//!   by content identifier
//! - **Cache-backed variants**: cache-only (content supplied exclusively by
//!   `put`), pinning-service backed with public-gateway fallback, and
//!   in-memory for tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                Application Layer                │
//! ├─────────────────────────────────────────────────┤
//! │                 IpfsStore Trait                 │
//! ├────────────────┬────────────────┬───────────────┤
//! │ CacheOnlyIpfs- │ PinningIpfs-   │ MemoryIpfs-   │
//! │     Store      │    Store       │    Store      │
//! ├────────────────┴────────────────┴───────────────┤
//! │   ObjectCache  +  pinning service  +  gateway   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Content-addressed entries share the key space of the underlying
//! [`ObjectCache`](ballot_cache::ObjectCache) under the `ipfs-{cid}` prefix.

pub mod cache_only;
pub mod cid_utils;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod pinned;
pub mod pinning;

pub use cache_only::CacheOnlyIpfsStore;
pub use cid_utils::{cid_for_json, create_cid, parse_cid, verify_cid, RAW_CODEC};
pub use error::{IpfsError, Result};
pub use gateway::{GatewayClient, GatewayConfig};
pub use memory::MemoryIpfsStore;
pub use pinned::PinningIpfsStore;
pub use pinning::{PinningClient, PinningConfig, UploadResponse};

use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Cache key for a content-addressed entry
///
/// Isolates content-addressed entries in the same key space as arbitrary
/// application cache keys.
pub fn cache_key(cid: &Cid) -> String {
    format!("ipfs-{}", cid)
}

/// Trait for content-addressed metadata stores
///
/// Content is immutable: an identifier is derived from the payload bytes, so
/// a `put` of identical data always yields the same identifier, and a `get`
/// can only ever observe the bytes that were stored (or fetched) for it.
#[async_trait]
pub trait IpfsStore: Send + Sync {
    /// Retrieve a JSON document by its content identifier
    async fn get<T>(&self, cid: &Cid) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync;

    /// Store a JSON document, returning its content identifier
    async fn put<T>(&self, data: &T) -> Result<Cid>
    where
        T: Serialize + Send + Sync;

    /// Retrieve raw bytes and their MIME type by content identifier
    async fn get_buffer(&self, cid: &Cid) -> Result<(Bytes, String)>;

    /// Store raw bytes with a MIME type, returning their content identifier
    async fn put_buffer(&self, data: &[u8], mime_type: &str) -> Result<Cid>;
}
