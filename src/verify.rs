//! Result Verifier: confirms a sent result message was accepted by
//! the queue service by comparing MD5 digests of the canonical JSON body.
//!
//! MD5 is used deliberately, not for any cryptographic property, because it
//! is the digest the queue service itself returns (`MD5OfMessageBody`) - a
//! delivery check, not a security check.

use md5::{Digest, Md5};

/// Compute the lowercase-hex MD5 digest of `body`'s canonical JSON
/// serialization, the same way the queue service computes the digest it
/// returns for a sent message.
pub fn digest_of(body: &serde_json::Value) -> String {
    let serialized = serde_json::to_string(body).expect("Value serialization cannot fail");
    digest_of_bytes(serialized.as_bytes())
}

fn digest_of_bytes(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// True iff the digest the queue service returned for a sent body matches
/// the digest computed locally for the body we intended to send.
///
/// Comparison is constant-string equality on lowercase hex; both sides are
/// normalized to lowercase before comparing so a differently-cased but
/// otherwise-identical digest returned by the service is still accepted.
pub fn verify_sent(expected_body: &serde_json::Value, returned_digest: &str) -> bool {
    digest_of(expected_body).eq_ignore_ascii_case(returned_digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matching_digest_verifies() {
        let body = json!({"ResultType": "success", "ItemHandle": "0000/item01"});
        let digest = digest_of(&body);
        assert!(verify_sent(&body, &digest));
    }

    #[test]
    fn mismatched_digest_fails() {
        let body = json!({"ResultType": "success"});
        assert!(!verify_sent(&body, "0000000000000000000000000000000"));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let body = json!({"a": 1});
        let digest = digest_of(&body).to_uppercase();
        assert!(verify_sent(&body, &digest));
    }

    #[test]
    fn known_vector_matches_md5_of_empty_json_string() {
        // MD5("\"\"") is a fixed, well-known vector; used as a sanity check
        // that we are hashing the serialized bytes, not something else.
        let body = json!("");
        assert_eq!(digest_of(&body), "9d4568c009d203ab10e33ea9953a0264");
    }
}
