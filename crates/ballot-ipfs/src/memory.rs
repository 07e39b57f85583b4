//! In-memory content-addressed store for testing and local development

use crate::{cid_utils, IpfsError, IpfsStore, Result};
use async_trait::async_trait;
use ballot_cache::JSON_MIME;
use bytes::Bytes;
use cid::Cid;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// An in-memory content-addressed store
#[derive(Clone, Default)]
pub struct MemoryIpfsStore {
    entries: Arc<DashMap<Cid, (Bytes, String)>>,
}

impl MemoryIpfsStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Get the number of entries stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// List all stored CIDs
    pub fn list_cids(&self) -> Vec<Cid> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }
}

#[async_trait]
impl IpfsStore for MemoryIpfsStore {
    async fn get<T>(&self, cid: &Cid) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let entry = self
            .entries
            .get(cid)
            .ok_or(IpfsError::NotFound(*cid))?;
        let (data, _mime_type) = entry.value();
        Ok(serde_json::from_slice(data)?)
    }

    async fn put<T>(&self, data: &T) -> Result<Cid>
    where
        T: Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(data)?;
        let cid = cid_utils::create_cid(&bytes);
        self.entries
            .insert(cid, (Bytes::from(bytes), JSON_MIME.to_string()));
        Ok(cid)
    }

    async fn get_buffer(&self, cid: &Cid) -> Result<(Bytes, String)> {
        self.entries
            .get(cid)
            .map(|entry| entry.value().clone())
            .ok_or(IpfsError::NotFound(*cid))
    }

    async fn put_buffer(&self, data: &[u8], mime_type: &str) -> Result<Cid> {
        let cid = cid_utils::create_cid(data);
        self.entries.insert(
            cid,
            (Bytes::copy_from_slice(data), mime_type.to_string()),
        );
        Ok(cid)
    }
}
