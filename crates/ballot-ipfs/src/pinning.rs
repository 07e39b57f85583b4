//! Pinning/storage service upload client
//!
//! Uploads content to a hosted pinning service (Web3.Storage, Pinata and
//! compatible APIs) and returns the service-assigned CID. Retrieval goes
//! through a gateway; this client only writes.

use crate::{cid_utils, IpfsError, Result};
use ballot_cache::{extension_for_mime, JSON_MIME};
use cid::Cid;
use reqwest::{multipart, Client};
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use tracing::instrument;

/// Configuration for a pinning service connection
#[derive(Clone, Debug)]
pub struct PinningConfig {
    /// Service API endpoint (e.g. "https://api.web3.storage")
    pub endpoint: String,
    /// Bearer token for authentication
    pub access_token: String,
    /// Request timeout
    pub timeout: Duration,
}

impl PinningConfig {
    /// Create a new pinning service config
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response from the service's upload endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct UploadResponse {
    /// CID assigned by the service
    pub cid: String,
}

/// Pinning service upload client
#[derive(Clone)]
pub struct PinningClient {
    http: Client,
    config: PinningConfig,
}

impl PinningClient {
    /// Create a new pinning service client
    pub fn new(config: PinningConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IpfsError::Connection(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.access_token)
    }

    /// Upload raw bytes, returning the CID the service assigned
    ///
    /// The uploaded file is named `data.{ext}` with the extension derived
    /// from the MIME type.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload(&self, data: &[u8], mime_type: &str) -> Result<Cid> {
        let url = format!("{}/upload", self.config.endpoint);
        let file_name = format!("data.{}", extension_for_mime(mime_type));

        let part = multipart::Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| IpfsError::Upload(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(IpfsError::Upload(format!(
                "upload failed ({}): {}",
                status, error
            )));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| IpfsError::Upload(e.to_string()))?;

        cid_utils::parse_cid(&result.cid)
    }

    /// Upload a JSON document, returning the CID the service assigned
    pub async fn upload_json<T: Serialize>(&self, data: &T) -> Result<Cid> {
        let bytes = serde_json::to_vec(data)?;
        self.upload(&bytes, JSON_MIME).await
    }
}
