//! Remote object-storage backend over an S3-compatible HTTP API
//!
//! Entries are stored as gzip-compressed objects: `{key}.json.gz` for JSON
//! payloads, `{key}.gz` (with the true MIME type in Content-Type) for buffer
//! payloads. Absence is a "not found" response from the remote store, and the
//! entry's last-modified time comes from the object's stored metadata.

use crate::{entry, CacheError, CachedObject, ObjectCache, Result, JSON_MIME};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::Client;
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for the remote object-storage backend
#[derive(Clone, Debug)]
pub struct S3CacheConfig {
    /// Object-storage endpoint URL (e.g. "http://localhost:9000")
    pub endpoint: String,
    /// Bucket holding the cache objects
    pub bucket: String,
    /// Bearer token for authentication
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for S3CacheConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            bucket: "voting-metadata-cache".to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl S3CacheConfig {
    /// Create a config for the given endpoint and bucket
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the access token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An object fetched from the remote store
#[derive(Clone, Debug)]
pub struct RemoteObject {
    /// Raw (still compressed) object bytes
    pub data: Bytes,
    /// Content-Type recorded on the object, if any
    pub content_type: Option<String>,
    /// Last-modified time from the object's metadata
    pub last_modified: DateTime<Utc>,
}

/// Narrow client for the remote object store: put, get, delete
#[derive(Clone)]
pub struct S3Client {
    http: Client,
    config: S3CacheConfig,
}

impl S3Client {
    /// Create a new client
    pub fn new(config: S3CacheConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CacheError::read("<client>", e))?;
        Ok(Self { http, config })
    }

    fn object_url(&self, object_key: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint, self.config.bucket, object_key)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    /// Store an object, overwriting any prior value
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn put_object(&self, object_key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let url = self.object_url(object_key);
        let response = self
            .authorize(self.http.put(&url))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| CacheError::write(object_key, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CacheError::write(
                object_key,
                format!("{} ({})", s3_error_message(&text, status.as_u16()), status),
            ));
        }

        Ok(())
    }

    /// Fetch an object; `Ok(None)` when the store reports it does not exist
    #[instrument(skip(self))]
    pub async fn get_object(&self, object_key: &str) -> Result<Option<RemoteObject>> {
        let url = self.object_url(object_key);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| CacheError::read(object_key, e))?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CacheError::read(
                object_key,
                format!("{} ({})", s3_error_message(&text, status.as_u16()), status),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let last_modified = response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let data = response
            .bytes()
            .await
            .map_err(|e| CacheError::read(object_key, e))?;

        Ok(Some(RemoteObject {
            data,
            content_type,
            last_modified,
        }))
    }

    /// Delete an object; deleting a nonexistent object is not an error
    #[instrument(skip(self))]
    pub async fn delete_object(&self, object_key: &str) -> Result<()> {
        let url = self.object_url(object_key);
        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| CacheError::write(object_key, e))?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CacheError::write(
                object_key,
                format!("{} ({})", s3_error_message(&text, status.as_u16()), status),
            ));
        }

        Ok(())
    }
}

/// Object cache persisting gzip-compressed entries in a remote bucket
#[derive(Clone)]
pub struct S3ObjectCache {
    client: S3Client,
}

impl S3ObjectCache {
    /// Create a cache over an existing client
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Create a cache directly from a config
    pub fn connect(config: S3CacheConfig) -> Result<Self> {
        Ok(Self {
            client: S3Client::new(config)?,
        })
    }

    fn json_object_key(cache_key: &str) -> String {
        format!("{}.json.gz", cache_key)
    }

    fn buffer_object_key(cache_key: &str) -> String {
        format!("{}.gz", cache_key)
    }
}

#[async_trait]
impl ObjectCache for S3ObjectCache {
    async fn read(&self, cache_key: &str) -> Result<Option<CachedObject>> {
        // JSON entries first, then the buffer convention - the remote
        // analogue of the filesystem's `{key}.*` extension discovery.
        if let Some(object) = self.client.get_object(&Self::json_object_key(cache_key)).await? {
            let data = gunzip(&object.data, cache_key)?;
            return Ok(Some(CachedObject {
                data: Bytes::from(data),
                mime_type: JSON_MIME.to_string(),
                last_modified: object.last_modified,
            }));
        }

        if let Some(object) = self.client.get_object(&Self::buffer_object_key(cache_key)).await? {
            let data = gunzip(&object.data, cache_key)?;
            return Ok(Some(CachedObject {
                data: Bytes::from(data),
                mime_type: object
                    .content_type
                    .unwrap_or_else(|| entry::OCTET_STREAM_MIME.to_string()),
                last_modified: object.last_modified,
            }));
        }

        Ok(None)
    }

    async fn write(&self, cache_key: &str, data: &[u8], mime_type: &str) -> Result<()> {
        let body = Bytes::from(gzip(data)?);
        let (object_key, sibling_key) = if mime_type == JSON_MIME {
            (Self::json_object_key(cache_key), Self::buffer_object_key(cache_key))
        } else {
            (Self::buffer_object_key(cache_key), Self::json_object_key(cache_key))
        };

        self.client.put_object(&object_key, body, mime_type).await?;
        // A key holds at most one live payload; drop the other convention's
        // object in case the entry changed shape.
        self.client.delete_object(&sibling_key).await?;

        debug!(key = cache_key, object_key = %object_key, "cache object written");
        Ok(())
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| CacheError::Serialization(format!("gzip failed: {}", e)))
}

fn gunzip(data: &[u8], cache_key: &str) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| {
        CacheError::Deserialization(format!("cached object '{}' is not valid gzip: {}", cache_key, e))
    })?;
    Ok(out)
}

/// Pull the error code and message out of an S3 XML error body
fn s3_error_message(xml: &str, status: u16) -> String {
    let code = extract_xml_element(xml, "Code").unwrap_or_else(|| format!("HTTP{}", status));
    let message =
        extract_xml_element(xml, "Message").unwrap_or_else(|| "unknown error".to_string());
    format!("{}: {}", code, message)
}

fn extract_xml_element(xml: &str, element: &str) -> Option<String> {
    let start_tag = format!("<{}>", element);
    let end_tag = format!("</{}>", element);

    let start = xml.find(&start_tag)? + start_tag.len();
    let end = xml.find(&end_tag)?;

    if start < end {
        Some(xml[start..end].to_string())
    } else {
        None
    }
}
