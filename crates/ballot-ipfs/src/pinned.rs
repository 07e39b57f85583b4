//! Pinning-service backed content-addressed store with gateway fallback
//!
//! Writes go to the hosted pinning service and are mirrored into the local
//! cache. Reads are served from the cache; on a miss the content is fetched
//! from the public gateway by CID and cached, with the stale-fallback enabled
//! so a gateway outage never takes down a page that only needs a cached
//! value.

use crate::{cache_key, GatewayClient, IpfsStore, PinningClient, Result};
use async_trait::async_trait;
use ballot_cache::ObjectCache;
use bytes::Bytes;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Content-addressed store combining a pinning service, a gateway, and a
/// local [`ObjectCache`]
#[derive(Clone)]
pub struct PinningIpfsStore<C: ObjectCache> {
    cache: C,
    pinning: PinningClient,
    gateway: GatewayClient,
}

impl<C: ObjectCache> PinningIpfsStore<C> {
    /// Create a store over the given cache and service clients
    pub fn new(cache: C, pinning: PinningClient, gateway: GatewayClient) -> Self {
        Self {
            cache,
            pinning,
            gateway,
        }
    }

    /// The underlying cache
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

#[async_trait]
impl<C: ObjectCache> IpfsStore for PinningIpfsStore<C> {
    async fn get<T>(&self, cid: &Cid) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let gateway = self.gateway.clone();
        let wanted = *cid;
        let value = self
            .cache
            .get_and_cache(
                &cache_key(cid),
                move |_existing: Option<T>| async move {
                    gateway
                        .get_json(&wanted)
                        .await
                        .map_err(anyhow::Error::new)
                },
                None,
                true,
            )
            .await?;
        Ok(value)
    }

    async fn get_buffer(&self, cid: &Cid) -> Result<(Bytes, String)> {
        let gateway = self.gateway.clone();
        let wanted = *cid;
        let buffer = self
            .cache
            .get_and_cache_buffer(
                &cache_key(cid),
                move |_existing| async move {
                    gateway
                        .get_buffer(&wanted)
                        .await
                        .map_err(anyhow::Error::new)
                },
                None,
                true,
            )
            .await?;
        Ok(buffer)
    }

    async fn put<T>(&self, data: &T) -> Result<Cid>
    where
        T: Serialize + Send + Sync,
    {
        let cid = self.pinning.upload_json(data).await?;
        // Mirror into the cache so a later get does not have to go back out
        // to the gateway.
        self.cache.put(&cache_key(&cid), data).await?;
        Ok(cid)
    }

    async fn put_buffer(&self, data: &[u8], mime_type: &str) -> Result<Cid> {
        let cid = self.pinning.upload(data, mime_type).await?;
        self.cache.put_buffer(&cache_key(&cid), data, mime_type).await?;
        Ok(cid)
    }
}
