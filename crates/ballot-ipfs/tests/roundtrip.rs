//! End-to-end tests for the content-addressed stores

use ballot_cache::{FileSystemObjectCache, MemoryObjectCache, ObjectCache};
use ballot_ipfs::{
    cid_for_json, create_cid, CacheOnlyIpfsStore, GatewayClient, GatewayConfig, IpfsError,
    IpfsStore, PinningClient, PinningConfig, PinningIpfsStore,
};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pinned_store(
    server: &MockServer,
    cache: MemoryObjectCache,
    verify: bool,
) -> PinningIpfsStore<MemoryObjectCache> {
    let mut gateway_config = GatewayConfig::path_style(server.uri());
    if verify {
        gateway_config = gateway_config.with_verification();
    }
    PinningIpfsStore::new(
        cache,
        PinningClient::new(PinningConfig::new(server.uri(), "test-token")).unwrap(),
        GatewayClient::new(gateway_config).unwrap(),
    )
}

#[tokio::test]
async fn test_end_to_end_cache_only_over_filesystem() {
    let dir = tempdir().unwrap();
    let store = CacheOnlyIpfsStore::new(FileSystemObjectCache::new(dir.path()));
    let metadata = json!({"title": "Round A"});

    let cid = store.put(&metadata).await.unwrap();

    // The identifier matches an independent computation over the serialized
    // bytes.
    assert_eq!(cid, cid_for_json(&metadata).unwrap());
    assert!(dir.path().join(format!("ipfs-{}.json", cid)).exists());

    let retrieved: serde_json::Value = store.get(&cid).await.unwrap();
    assert_eq!(retrieved, metadata);

    let fabricated = create_cid(b"never written");
    let missing: Result<serde_json::Value, _> = store.get(&fabricated).await;
    assert!(matches!(missing, Err(IpfsError::NotFound(c)) if c == fabricated));
}

#[tokio::test]
async fn test_double_put_is_one_logical_entry() {
    let dir = tempdir().unwrap();
    let store = CacheOnlyIpfsStore::new(FileSystemObjectCache::new(dir.path()));
    let metadata = json!({"title": "Round A"});

    let first = store.put(&metadata).await.unwrap();
    let second = store.put(&metadata).await.unwrap();
    assert_eq!(first, second);

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
    while let Some(e) = entries.next_entry().await.unwrap() {
        files.push(e.file_name().to_string_lossy().to_string());
    }
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_gateway_fallback_populates_cache_once() {
    let server = MockServer::start().await;
    let metadata = json!({"title": "Round B"});
    let bytes = serde_json::to_vec(&metadata).unwrap();
    let cid = create_cid(&bytes);

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", cid)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes)
                .insert_header("Content-Type", "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = pinned_store(&server, MemoryObjectCache::new(), false);

    let first: serde_json::Value = store.get(&cid).await.unwrap();
    assert_eq!(first, metadata);
    assert_eq!(store.cache().len(), 1);

    // Cached now; the gateway must not be hit again (expect(1) above).
    let second: serde_json::Value = store.get(&cid).await.unwrap();
    assert_eq!(second, metadata);
}

#[tokio::test]
async fn test_gateway_miss_is_not_found() {
    let server = MockServer::start().await;
    let cid = create_cid(b"unpinned content");

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", cid)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = pinned_store(&server, MemoryObjectCache::new(), false);
    let result: Result<serde_json::Value, _> = store.get(&cid).await;

    assert!(matches!(result, Err(IpfsError::NotFound(c)) if c == cid));
}

#[tokio::test]
async fn test_gateway_outage_with_empty_cache_propagates() {
    let server = MockServer::start().await;
    let cid = create_cid(b"some content");

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", cid)))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let store = pinned_store(&server, MemoryObjectCache::new(), false);
    let result: Result<serde_json::Value, _> = store.get(&cid).await;

    assert!(matches!(result, Err(IpfsError::Gateway(_))));
}

#[tokio::test]
async fn test_verification_rejects_corrupted_content() {
    let server = MockServer::start().await;
    let cid = create_cid(b"the real bytes");

    Mock::given(method("GET"))
        .and(path(format!("/ipfs/{}", cid)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"tampered bytes".to_vec())
                .insert_header("Content-Type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let verifying = pinned_store(&server, MemoryObjectCache::new(), true);
    let result = verifying.get_buffer(&cid).await;
    assert!(matches!(result, Err(IpfsError::HashMismatch { .. })));

    // Without verification the tampered bytes pass through untouched.
    let trusting = pinned_store(&server, MemoryObjectCache::new(), false);
    let (data, _mime) = trusting.get_buffer(&cid).await.unwrap();
    assert_eq!(data.as_ref(), b"tampered bytes");
}

#[tokio::test]
async fn test_put_uploads_and_seeds_the_cache() {
    let server = MockServer::start().await;
    let metadata = json!({"title": "Round C"});
    let cid = cid_for_json(&metadata).unwrap();

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"cid": cid.to_string()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cache = MemoryObjectCache::new();
    let store = pinned_store(&server, cache.clone(), false);

    let returned = store.put(&metadata).await.unwrap();
    assert_eq!(returned, cid);

    // The upload seeded the local cache under the service-assigned CID, so a
    // get never needs the gateway.
    let entry = cache.read(&format!("ipfs-{}", cid)).await.unwrap().unwrap();
    let stored: serde_json::Value = serde_json::from_slice(&entry.data).unwrap();
    assert_eq!(stored, metadata);

    let fetched: serde_json::Value = store.get(&cid).await.unwrap();
    assert_eq!(fetched, metadata);
}

#[tokio::test]
async fn test_put_buffer_uploads_with_mime_type() {
    let server = MockServer::start().await;
    let payload = b"%PDF-1.7 proposal";
    let cid = create_cid(payload);

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"cid": cid.to_string()})),
        )
        .mount(&server)
        .await;

    let cache = MemoryObjectCache::new();
    let store = pinned_store(&server, cache.clone(), false);

    let returned = store.put_buffer(payload, "application/pdf").await.unwrap();
    assert_eq!(returned, cid);

    let (data, mime_type) = store.get_buffer(&cid).await.unwrap();
    assert_eq!(data.as_ref(), payload);
    assert_eq!(mime_type, "application/pdf");
}

#[tokio::test]
async fn test_rejected_upload_is_an_upload_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let store = pinned_store(&server, MemoryObjectCache::new(), false);
    let result = store.put(&json!({"title": "Round D"})).await;

    assert!(matches!(result, Err(IpfsError::Upload(_))));
}
