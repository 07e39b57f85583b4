//! In-memory object cache for testing and local development

use crate::{CachedObject, ObjectCache, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// An in-memory object cache
///
/// Entries live in a shared map; clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryObjectCache {
    entries: Arc<DashMap<String, CachedObject>>,
}

impl MemoryObjectCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Get the number of entries stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// List all cache keys
    pub fn list_keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Write an entry with an explicit last-modified time
    ///
    /// Lets tests construct entries of a known age.
    pub fn write_at(
        &self,
        cache_key: &str,
        data: &[u8],
        mime_type: &str,
        last_modified: DateTime<Utc>,
    ) {
        self.entries.insert(
            cache_key.to_string(),
            CachedObject {
                data: Bytes::copy_from_slice(data),
                mime_type: mime_type.to_string(),
                last_modified,
            },
        );
    }
}

#[async_trait]
impl ObjectCache for MemoryObjectCache {
    async fn read(&self, cache_key: &str) -> Result<Option<CachedObject>> {
        Ok(self.entries.get(cache_key).map(|entry| entry.value().clone()))
    }

    async fn write(&self, cache_key: &str, data: &[u8], mime_type: &str) -> Result<()> {
        self.entries
            .insert(cache_key.to_string(), CachedObject::new(data.to_vec(), mime_type));
        Ok(())
    }
}
