//! CID (Content Identifier) utilities
//!
//! Identifiers are CIDv1 with the raw codec and a sha2-256 digest over the
//! payload bytes, so they match what public IPFS gateways compute for the
//! same content. Identity is over serialized bytes: two JSON documents that
//! differ only in key order get different identifiers.

use crate::{IpfsError, Result};
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::Serialize;

/// Multicodec code for raw binary content (0x55)
pub const RAW_CODEC: u64 = 0x55;

/// Create a CID for a byte payload
///
/// Deterministic and collision-resistant; never fails, including for the
/// empty payload.
pub fn create_cid(data: &[u8]) -> Cid {
    let multihash = Code::Sha2_256.digest(data);
    Cid::new_v1(RAW_CODEC, multihash)
}

/// Create a CID for a JSON-serializable value
///
/// Hashes the compact JSON serialization of `data`, recomputed on every call.
pub fn cid_for_json<T: Serialize>(data: &T) -> Result<Cid> {
    let bytes = serde_json::to_vec(data)?;
    Ok(create_cid(&bytes))
}

/// Verify that a payload hashes back to a CID
pub fn verify_cid(data: &[u8], cid: &Cid) -> bool {
    create_cid(data) == *cid
}

/// Parse a CID from its string form
pub fn parse_cid(s: &str) -> Result<Cid> {
    s.parse()
        .map_err(|e: cid::Error| IpfsError::InvalidCid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid::Version;
    use proptest::prelude::*;

    #[test]
    fn test_create_cid_shape() {
        let cid = create_cid(b"Hello, World!");

        assert_eq!(cid.version(), Version::V1);
        assert_eq!(cid.codec(), RAW_CODEC);
        // Default string form of a CIDv1 is base32-lower, prefix 'b'.
        assert!(cid.to_string().starts_with('b'));
    }

    #[test]
    fn test_empty_payload_is_allowed() {
        let cid = create_cid(b"");
        assert_eq!(cid, create_cid(b""));
    }

    #[test]
    fn test_json_identity_is_over_bytes() {
        // Same fields, different serialized key order: different identifiers.
        let a = serde_json::json!({"title": "Round A", "id": 1});
        let b: serde_json::Value =
            serde_json::from_str(r#"{"id": 1, "title": "Round A"}"#).unwrap();

        let bytes_a = serde_json::to_vec(&a).unwrap();
        let bytes_b = serde_json::to_vec(&b).unwrap();
        assert_eq!(
            bytes_a == bytes_b,
            cid_for_json(&a).unwrap() == cid_for_json(&b).unwrap()
        );
    }

    #[test]
    fn test_verify_cid() {
        let cid = create_cid(b"verify me");

        assert!(verify_cid(b"verify me", &cid));
        assert!(!verify_cid(b"wrong data", &cid));
    }

    #[test]
    fn test_cid_string_roundtrip() {
        let cid = create_cid(b"roundtrip");
        let parsed = parse_cid(&cid.to_string()).unwrap();
        assert_eq!(cid, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_cid("not-a-cid"), Err(IpfsError::InvalidCid(_))));
    }

    proptest! {
        #[test]
        fn prop_cid_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(create_cid(&data), create_cid(&data));
        }

        #[test]
        fn prop_distinct_payloads_get_distinct_cids(
            a in proptest::collection::vec(any::<u8>(), 0..64),
            b in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(create_cid(&a), create_cid(&b));
        }

        #[test]
        fn prop_single_byte_payloads_are_distinct(byte in any::<u8>()) {
            prop_assert_ne!(create_cid(&[byte]), create_cid(b""));
        }
    }
}
