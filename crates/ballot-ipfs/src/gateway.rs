//! Public IPFS gateway client
//!
//! Fetches immutable content by CID over HTTP. Supports the subdomain
//! addressing used by public gateways (`https://{cid}.{host}/`) and
//! path-style addressing (`{base}/ipfs/{cid}`) for local nodes and tests.

use crate::{cid_utils, IpfsError, Result};
use bytes::Bytes;
use cid::Cid;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

/// How content URLs are formed for a CID
#[derive(Clone, Debug)]
pub enum GatewayEndpoint {
    /// `https://{cid}.{host}/` (e.g. host "ipfs.cf-ipfs.com")
    Subdomain(String),
    /// `{base}/ipfs/{cid}` (e.g. a local node or a test server)
    Path(String),
}

/// Configuration for a gateway connection
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Where content for a CID resolves
    pub endpoint: GatewayEndpoint,
    /// Request timeout
    pub timeout: Duration,
    /// Verify that fetched bytes hash back to the requested CID
    pub verify_content: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: GatewayEndpoint::Subdomain("ipfs.cf-ipfs.com".to_string()),
            timeout: Duration::from_secs(30),
            verify_content: false,
        }
    }
}

impl GatewayConfig {
    /// Create a config for a subdomain gateway host
    pub fn subdomain(host: impl Into<String>) -> Self {
        Self {
            endpoint: GatewayEndpoint::Subdomain(host.into()),
            ..Default::default()
        }
    }

    /// Create a config for a path-style gateway base URL
    pub fn path_style(base_url: impl Into<String>) -> Self {
        Self {
            endpoint: GatewayEndpoint::Path(base_url.into()),
            ..Default::default()
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable content verification
    pub fn with_verification(mut self) -> Self {
        self.verify_content = true;
        self
    }
}

/// HTTP client fetching content by CID from an IPFS gateway
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a new gateway client
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IpfsError::Connection(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// The URL content for `cid` resolves at
    pub fn content_url(&self, cid: &Cid) -> String {
        match &self.config.endpoint {
            GatewayEndpoint::Subdomain(host) => format!("https://{}.{}/", cid, host),
            GatewayEndpoint::Path(base) => format!("{}/ipfs/{}", base, cid),
        }
    }

    /// Fetch raw content and its Content-Type by CID
    #[instrument(skip(self))]
    pub async fn get_buffer(&self, cid: &Cid) -> Result<(Bytes, String)> {
        let url = self.content_url(cid);
        let response = self.http.get(&url).send().await?;

        if response.status().as_u16() == 404 {
            return Err(IpfsError::NotFound(*cid));
        }
        if !response.status().is_success() {
            return Err(IpfsError::Gateway(format!(
                "gateway returned {} for {}",
                response.status(),
                url
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(ballot_cache::OCTET_STREAM_MIME)
            .to_string();

        let data = response.bytes().await?;

        if self.config.verify_content && !cid_utils::verify_cid(&data, cid) {
            return Err(IpfsError::HashMismatch {
                expected: cid.to_string(),
                actual: cid_utils::create_cid(&data).to_string(),
            });
        }

        Ok((data, mime_type))
    }

    /// Fetch and deserialize a JSON document by CID
    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, cid: &Cid) -> Result<T> {
        let (data, _mime_type) = self.get_buffer(cid).await?;
        serde_json::from_slice(&data)
            .map_err(|e| IpfsError::Gateway(format!("gateway returned invalid JSON for {}: {}", cid, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_url_shape() {
        let client = GatewayClient::new(GatewayConfig::default()).unwrap();
        let cid = cid_utils::create_cid(b"content");

        let url = client.content_url(&cid);
        assert!(url.starts_with(&format!("https://{}.", cid)));
        assert!(url.ends_with(".ipfs.cf-ipfs.com/"));
    }

    #[test]
    fn test_path_style_url_shape() {
        let client =
            GatewayClient::new(GatewayConfig::path_style("http://127.0.0.1:8080")).unwrap();
        let cid = cid_utils::create_cid(b"content");

        assert_eq!(
            client.content_url(&cid),
            format!("http://127.0.0.1:8080/ipfs/{}", cid)
        );
    }
}
