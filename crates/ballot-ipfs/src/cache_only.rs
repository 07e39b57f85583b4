//! Cache-only content-addressed store
//!
//! No network: content can only ever be supplied by an explicit `put`. A
//! `get` for an identifier that was never stored fails with
//! [`IpfsError::NotFound`], because immutable content-addressed data cannot
//! be regenerated.

use crate::{cache_key, cid_utils, IpfsError, IpfsStore, Result};
use async_trait::async_trait;
use ballot_cache::ObjectCache;
use bytes::Bytes;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Content-addressed store backed purely by an [`ObjectCache`]
#[derive(Clone)]
pub struct CacheOnlyIpfsStore<C: ObjectCache> {
    cache: C,
}

impl<C: ObjectCache> CacheOnlyIpfsStore<C> {
    /// Create a store over the given cache
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    /// The underlying cache
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

#[async_trait]
impl<C: ObjectCache> IpfsStore for CacheOnlyIpfsStore<C> {
    async fn get<T>(&self, cid: &Cid) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let wanted = *cid;
        let value = self
            .cache
            .get_and_cache(
                &cache_key(cid),
                move |_existing: Option<T>| async move {
                    Err(anyhow::Error::new(IpfsError::NotFound(wanted)))
                },
                None,
                true,
            )
            .await?;
        Ok(value)
    }

    async fn put<T>(&self, data: &T) -> Result<Cid>
    where
        T: Serialize + Send + Sync,
    {
        let cid = cid_utils::cid_for_json(data)?;
        let value = serde_json::to_value(data)?;

        // Write-through: the entry is rewritten unconditionally.
        self.cache
            .get_and_cache(
                &cache_key(&cid),
                move |_existing: Option<serde_json::Value>| async move { Ok(value) },
                Some(0),
                false,
            )
            .await?;

        Ok(cid)
    }

    async fn get_buffer(&self, cid: &Cid) -> Result<(Bytes, String)> {
        let wanted = *cid;
        let buffer = self
            .cache
            .get_and_cache_buffer(
                &cache_key(cid),
                move |_existing| async move {
                    Err(anyhow::Error::new(IpfsError::NotFound(wanted)))
                },
                None,
                true,
            )
            .await?;
        Ok(buffer)
    }

    async fn put_buffer(&self, data: &[u8], mime_type: &str) -> Result<Cid> {
        let cid = cid_utils::create_cid(data);
        let owned = Bytes::copy_from_slice(data);
        let mime_type = mime_type.to_string();

        self.cache
            .get_and_cache_buffer(
                &cache_key(&cid),
                move |_existing| async move { Ok((owned, mime_type)) },
                Some(0),
                false,
            )
            .await?;

        Ok(cid)
    }
}
